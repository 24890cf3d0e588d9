use poise::{Command, CreateReply};
use serenity::builder::CreateEmbed;
use crate::{PanelContext, Error};

#[poise::command(
    prefix_command,
    slash_command,
    description_localized("en-US", "Display the list of commands available, as well as their descriptions.")
)]
pub async fn help(
    ctx: PanelContext<'_>,
    #[description = "The command requested for help"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    #[rest] command: Option<String>
) -> Result<(), Error> {
    match command {
        Some(command) => help_single_command(&ctx, &command).await,
        None => help_all_commands(&ctx).await
    }
}

/// Walks `rppanel create`-style paths down through subcommands.
fn find_command<'a>(commands: &'a [Command<(), Error>], path: &str) -> Option<&'a Command<(), Error>> {
    let mut parts = path.split_whitespace();
    let first = parts.next()?;

    let mut found = commands.iter().find(|command| {
        command.name.eq_ignore_ascii_case(first)
            || command.aliases.iter().any(|o| o.eq_ignore_ascii_case(first))
            || command.context_menu_name.as_deref().map(|o| o.eq_ignore_ascii_case(first)).unwrap_or(false)
    })?;

    for part in parts {
        found = found.subcommands.iter().find(|o| o.name.eq_ignore_ascii_case(part))?;
    }

    Some(found)
}

fn describe(cmd: &Command<(), Error>) -> String {
    if let Some(help_text) = cmd.help_text.as_ref() {
        help_text.clone()
    } else if let Some(description) = cmd.description.as_ref() {
        description.clone()
    } else if let Some(description) = cmd.description_localizations.values().next() {
        description.clone()
    } else {
        "No help available".to_string()
    }
}

async fn help_single_command(
    ctx: &PanelContext<'_>,
    command_name: &str
) -> Result<(), Error> {
    let reply = match find_command(&ctx.framework().options().commands, command_name) {
        Some(command) => {
            let mut text = format!("`{}`: {}", command.qualified_name, describe(command));

            for subcommand in &command.subcommands {
                text.push_str(&format!("\n- `{}`: {}", subcommand.name, describe(subcommand)));
            }

            text
        }
        None => format!("No such command `{}`", command_name)
    };

    ctx.say(reply).await?;
    Ok(())
}

struct CommandHelp {
    name: String,
    description: String,
    subcommands: Vec<CommandHelp>
}

fn generate_command_help(cmd: &Command<(), Error>) -> CommandHelp {
    CommandHelp {
        name: cmd.identifying_name.clone(),
        description: describe(cmd),
        subcommands: cmd.subcommands.iter().map(generate_command_help).collect()
    }
}

/// Code for printing an overview of all commands (e.g. `!help`)
async fn help_all_commands(
    ctx: &PanelContext<'_>
) -> Result<(), Error> {
    let mut help: Vec<CommandHelp> = Vec::new();

    let mut general = CommandHelp {
        name: "General".to_string(),
        description: "Basic commands".to_string(),
        subcommands: Vec::new()
    };

    for cmd in &ctx.framework().options().commands {
        if cmd.hide_in_help {
            continue;
        }

        let command_help = generate_command_help(cmd);

        if command_help.subcommands.is_empty() {
            general.subcommands.push(command_help);
        } else {
            help.push(command_help);
        }
    }

    help.insert(0, general);

    let mut embed = CreateEmbed::new()
        .title("RPPanel Command Help")
        .description("You can fetch help for a specific command by passing the full command as a parameter.");

    for base_command in help {
        let command_list = base_command.subcommands.iter()
            .map(|cmd| format!("`{}`", cmd.name))
            .reduce(|a, b| format!("{}\n{}", a, b))
            .unwrap_or_default();

        embed = embed.field(base_command.name, format!("_{}_\n\n{}", base_command.description, command_list), false);
    }

    ctx.send(CreateReply::default().embed(embed)).await?;

    Ok(())
}
