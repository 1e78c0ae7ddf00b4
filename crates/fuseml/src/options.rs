//! Command line flags and prompts for installation options
//!
//! Every declared option becomes a flag named after it (`system_domain` is
//! `--system-domain`) that can also be set through a `FUSEML_` environment
//! variable. Values are layered defaults first, then prompts, then flags.

use std::collections::HashSet;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::{Confirm, Input};
use fuseml_core::options::{
    DefaultOptionsReader, InstallationOption, InstallationOptions, OptionType, OptionValue,
    OptionsReader, ProvidedOption,
};
use fuseml_core::{Error, Result};

/// Long flag of an option
pub fn flag_name(option: &InstallationOption) -> String {
    option.key().replace(['_', '@'], "-")
}

fn env_name(option: &InstallationOption) -> String {
    format!("FUSEML_{}", option.key().replace('@', "_").to_uppercase())
}

/// Add one flag per option to `cmd`
pub fn add_option_flags(mut cmd: Command, options: &InstallationOptions) -> Command {
    for option in options.iter() {
        let arg = Arg::new(option.key())
            .long(flag_name(option))
            .help(option.description.clone())
            .env(env_name(option));
        let arg = match option.option_type {
            OptionType::Bool => arg.action(ArgAction::SetTrue),
            OptionType::Int => arg
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(i64)),
            OptionType::List => arg.action(ArgAction::Set).value_name("A,B,..."),
            OptionType::String => arg.action(ArgAction::Set),
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

/// Reads the options given as flags or environment variables
pub struct CliOptionsReader<'a> {
    matches: &'a ArgMatches,
}

impl<'a> CliOptionsReader<'a> {
    pub fn new(matches: &'a ArgMatches) -> Self {
        Self { matches }
    }

    fn value(&self, option: &InstallationOption) -> Result<Option<OptionValue>> {
        let id = option.key();
        match self.matches.value_source(&id) {
            Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable) => {}
            _ => return Ok(None),
        }

        let value = match option.option_type {
            OptionType::Bool => self
                .matches
                .try_get_one::<bool>(&id)
                .map_err(|e| Error::config(e.to_string()))?
                .map(|b| OptionValue::Bool(*b)),
            OptionType::Int => self
                .matches
                .try_get_one::<i64>(&id)
                .map_err(|e| Error::config(e.to_string()))?
                .map(|i| OptionValue::Int(*i)),
            OptionType::String | OptionType::List => self
                .matches
                .try_get_one::<String>(&id)
                .map_err(|e| Error::config(e.to_string()))?
                .map(|raw| OptionValue::parse(&option.name, option.option_type, raw))
                .transpose()?,
        };
        Ok(value)
    }
}

impl OptionsReader for CliOptionsReader<'_> {
    fn read(&mut self, options: &InstallationOptions) -> Result<Vec<ProvidedOption>> {
        let mut provided = Vec::new();
        for option in options.iter() {
            if let Some(value) = self.value(option)? {
                provided.push(provide(option, value));
            }
        }
        Ok(provided)
    }
}

/// Asks for every option not already given on the command line
pub struct InteractiveOptionsReader {
    skip: HashSet<String>,
}

impl InteractiveOptionsReader {
    pub fn new(skip: HashSet<String>) -> Self {
        Self { skip }
    }

    fn prompt(option: &InstallationOption) -> Result<OptionValue> {
        let prompt = format!("{} ({})", option.description, option.key());
        let current = option.effective();
        let value = match option.option_type {
            OptionType::Bool => OptionValue::Bool(
                Confirm::new()
                    .with_prompt(prompt)
                    .default(current.as_bool().unwrap_or(false))
                    .interact()
                    .map_err(prompt_error)?,
            ),
            OptionType::Int => OptionValue::Int(
                Input::<i64>::new()
                    .with_prompt(prompt)
                    .default(current.as_int().unwrap_or(0))
                    .interact_text()
                    .map_err(prompt_error)?,
            ),
            OptionType::String | OptionType::List => {
                let raw: String = Input::new()
                    .with_prompt(prompt)
                    .default(current.to_string())
                    .allow_empty(true)
                    .interact_text()
                    .map_err(prompt_error)?;
                OptionValue::parse(&option.name, option.option_type, &raw)?
            }
        };
        Ok(value)
    }
}

impl OptionsReader for InteractiveOptionsReader {
    fn read(&mut self, options: &InstallationOptions) -> Result<Vec<ProvidedOption>> {
        let mut provided = Vec::new();
        for option in options.iter().filter(|o| !self.skip.contains(&o.key())) {
            provided.push(provide(option, Self::prompt(option)?));
        }
        Ok(provided)
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::config(format!("failed to read answer: {}", e))
}

fn provide(option: &InstallationOption, value: OptionValue) -> ProvidedOption {
    match &option.deployment_id {
        Some(id) => ProvidedOption::scoped(&option.name, id, value),
        None => ProvidedOption::new(&option.name, value),
    }
}

/// Fill `options` from defaults, prompts (when interactive) and flags
pub fn resolve(
    options: &mut InstallationOptions,
    matches: &ArgMatches,
    interactive: bool,
) -> Result<()> {
    options.populate(&mut DefaultOptionsReader)?;

    if interactive {
        let given: HashSet<String> = options
            .iter()
            .filter(|o| {
                matches!(
                    matches.value_source(&o.key()),
                    Some(ValueSource::CommandLine) | Some(ValueSource::EnvVariable)
                )
            })
            .map(InstallationOption::key)
            .collect();
        options.populate(&mut InteractiveOptionsReader::new(given))?;
    }

    options.populate(&mut CliOptionsReader::new(matches))
}
