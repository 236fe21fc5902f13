//! Visemes command - list channels with their class and priority

use anyhow::Result;
use console::{style, Term};
use visemeflow_core::viseme::{VisemeClass, OVR_VISEME_NAMES};
use visemeflow_core::Config;

pub fn list(config: &Config) -> Result<()> {
    let term = Term::stdout();
    let classification = config.tables.classification()?;
    let priority = config.tables.priority()?;

    term.write_line(&format!("{}", style("OVR Viseme Channels").bold()))?;
    term.write_line("")?;
    term.write_line(&format!(
        "  {:>3}  {:5} {:10} {}",
        style("#").dim(),
        style("name").dim(),
        style("class").dim(),
        style("priority").dim()
    ))?;

    for (channel, name) in OVR_VISEME_NAMES.iter().enumerate() {
        let class = classification.class_of(channel);
        let class_label = match class {
            VisemeClass::Consonant => style(class.display_name()).yellow(),
            VisemeClass::Vowel => style(class.display_name()).cyan(),
            VisemeClass::Other => style(class.display_name()).dim(),
        };

        term.write_line(&format!(
            "  {:>3}  {:5} {:10} {:.2}",
            channel,
            name,
            class_label,
            priority.weight(channel)
        ))?;
    }

    term.write_line("")?;
    if config.tables.replace_defaults
        || !config.tables.classification.is_empty()
        || !config.tables.priority.is_empty()
    {
        term.write_line(&format!(
            "{} Includes overrides from the config file",
            style("ℹ").blue()
        ))?;
    }
    term.write_line(&format!(
        "Run {} to change a channel",
        style("visemeflow config set priority.<name> <0-1>").cyan()
    ))?;

    Ok(())
}
