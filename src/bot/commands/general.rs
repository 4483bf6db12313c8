//! General Discord commands - ping, help and the reply language.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{
            i18n::{self, SUPPORTED_LANGUAGES},
            state,
        },
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Waterline Help**\n\
        Water level monitoring for the IITM Zanzibar distribution network.\n\n\
        **Monitoring**\n\
        • `/pages` - Lists the monitoring pages and their sensors.\n\
        • `/levels [page]` - Shows current water levels against their thresholds.\n\n\
        **Alert Settings**\n\
        • `/threshold set <sensor> [min] [max]` - Sets alert bounds in cm.\n\
        • `/threshold clear <sensor>` - Removes a sensor's bounds.\n\
        • `/threshold show` - Lists all configured bounds.\n\
        • `/repeat <sensor> <enabled>` - Re-alert every 5 minutes while a breach lasts.\n\n\
        **Language**\n\
        • `/language [code]` - Shows or sets the language of headings.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows or changes the language used for reply headings.
    #[poise::command(slash_command, prefix_command)]
    pub async fn language(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Language code, e.g. en, sw, ta"]
        #[autocomplete = "autocomplete::autocomplete_language"]
        code: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let Some(code) = code else {
            let translator = state::load_translator(db).await?;
            ctx.say(format!(
                "{} `{}` (available: {})",
                translator.get("language_label"),
                translator.language(),
                SUPPORTED_LANGUAGES.join(", ")
            ))
            .await?;
            return Ok(());
        };

        let code = code.trim().to_lowercase();
        if let Err(e) = i18n::validate_language(&code) {
            ctx.say(format!("❌ {e}. Available: {}", SUPPORTED_LANGUAGES.join(", ")))
                .await?;
            return Ok(());
        }
        state::save_preferred_language(db, &code).await?;
        let translator = state::load_translator(db).await?;
        ctx.say(format!("✅ {} `{}`", translator.get("language_label"), code))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
