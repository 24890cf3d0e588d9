#[macro_export]
macro_rules! paneldb {
    ($ctx: expr) => {
        {
            match $crate::services::panel_store::PanelStore::from_context($ctx.serenity_context()).await {
                Some(store) => store,
                None => return Err("Couldn't find the panel store".into())
            }
        }
    }
}
