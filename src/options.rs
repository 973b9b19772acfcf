use std::collections::BTreeMap;
use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};

use crate::error::CommandLineError;

/// Name the loader goes by in usage text.
pub const PROGRAM_NAME: &str = "load";

/// One recognized flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub short: char,
    pub long: &'static str,
    pub takes_value: bool,
    pub required: bool,
    pub help: &'static str,
}

pub const OPTION_SPECS: &[OptionSpec] = &[
    OptionSpec {
        short: 'f',
        long: "file",
        takes_value: true,
        required: true,
        help: "dataset to load",
    },
    OptionSpec {
        short: 'h',
        long: "host",
        takes_value: true,
        required: true,
        help: "target host",
    },
    OptionSpec {
        short: 'p',
        long: "port",
        takes_value: true,
        required: true,
        help: "target port",
    },
    OptionSpec {
        short: 'c',
        long: "clusterName",
        takes_value: true,
        required: true,
        help: "cluster name",
    },
    OptionSpec {
        short: 'o',
        long: "onlySchema",
        takes_value: false,
        required: false,
        help: "only load schema",
    },
    OptionSpec {
        short: 'r',
        long: "replicationFactor",
        takes_value: true,
        required: false,
        help: "override the replication factor set in the dataset",
    },
    OptionSpec {
        short: 's',
        long: "strategy",
        takes_value: true,
        required: false,
        help: "override the strategy set in the dataset",
    },
];

impl OptionSpec {
    fn to_arg(self) -> Arg {
        let arg = Arg::new(self.long)
            .short(self.short)
            .long(self.long)
            .help(self.help)
            .required(self.required);
        if self.takes_value {
            arg.action(ArgAction::Set)
                .num_args(1)
                .value_name("arg")
                .allow_negative_numbers(true)
        } else {
            arg.action(ArgAction::SetTrue)
        }
    }

    /// Left-hand column of the usage text, e.g. `-f,--file <arg>`.
    fn synopsis(&self) -> String {
        let mut synopsis = format!("-{},--{}", self.short, self.long);
        if self.takes_value {
            synopsis.push_str(" <arg>");
        }
        synopsis
    }
}

/// Builds a fresh clap command from the option table. Nothing is cached
/// between calls so every parse starts from a clean schema.
pub fn command() -> Command {
    OPTION_SPECS.iter().fold(
        Command::new(PROGRAM_NAME)
            .no_binary_name(true)
            // `-h` is the target host, not help
            .disable_help_flag(true)
            .disable_version_flag(true)
            // a repeated option keeps its last value
            .args_override_self(true),
        |command, spec| command.arg(spec.to_arg()),
    )
}

/// Options given on one command line, keyed by their short name. Flags
/// without a value map to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    values: BTreeMap<char, Option<String>>,
}

impl ParsedOptions {
    pub fn has_option(&self, short: char) -> bool {
        self.values.contains_key(&short)
    }

    pub fn value(&self, short: char) -> Option<&str> {
        self.values.get(&short).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parses the process arguments (program name excluded).
///
/// An empty argument list is a request for usage, not a parse failure.
/// Value formats are not checked here beyond what clap itself rejects.
pub fn parse_command_line<I, T>(args: I) -> Result<ParsedOptions, CommandLineError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.is_empty() {
        return Err(CommandLineError::UsageRequested);
    }

    let matches = command()
        .try_get_matches_from(args)
        .map_err(|err| CommandLineError::Parse(parse_error_message(&err)))?;

    let mut values = BTreeMap::new();
    for spec in OPTION_SPECS {
        if spec.takes_value {
            if let Some(value) = matches.get_one::<String>(spec.long) {
                values.insert(spec.short, Some(value.clone()));
            }
        } else if matches.get_flag(spec.long) {
            values.insert(spec.short, None);
        }
    }
    Ok(ParsedOptions { values })
}

// First paragraph of clap's report, on one line and without the "error: " tag
fn parse_error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let head = rendered.split("\n\n").next().unwrap_or_default();
    let head = head.strip_prefix("error: ").unwrap_or(head);
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Usage text listing every option, sorted by short name.
pub fn usage() -> String {
    let mut specs: Vec<&OptionSpec> = OPTION_SPECS.iter().collect();
    specs.sort_by_key(|spec| spec.short);

    let width = specs
        .iter()
        .map(|spec| spec.synopsis().len())
        .max()
        .unwrap_or_default();

    let mut text = format!("usage: {PROGRAM_NAME}\n");
    for spec in specs {
        let status = if spec.required { "required" } else { "optional" };
        text.push_str(&format!(
            " {:<width$}   {} ({status})\n",
            spec.synopsis(),
            spec.help,
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 8] = [
        "-f",
        "data.xml",
        "-h",
        "127.0.0.1",
        "-p",
        "9042",
        "-c",
        "TestCluster",
    ];

    fn with(extra: &[&str]) -> Vec<String> {
        REQUIRED
            .iter()
            .chain(extra.iter())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_command_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn test_short_keys_are_unique() {
        let mut keys: Vec<char> = OPTION_SPECS.iter().map(|s| s.short).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), OPTION_SPECS.len());
    }

    #[test]
    fn test_parse_required_options() {
        let parsed = parse_command_line(with(&[])).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed.value('f'), Some("data.xml"));
        assert_eq!(parsed.value('h'), Some("127.0.0.1"));
        assert_eq!(parsed.value('p'), Some("9042"));
        assert_eq!(parsed.value('c'), Some("TestCluster"));
        assert!(!parsed.has_option('o'));
        assert!(!parsed.has_option('r'));
        assert!(!parsed.has_option('s'));
    }

    #[test]
    fn test_parse_long_forms() {
        let parsed = parse_command_line([
            "--file=data.xml",
            "--host",
            "localhost",
            "--port",
            "9171",
            "--clusterName",
            "Test Cluster",
            "--onlySchema",
            "--replicationFactor",
            "3",
            "--strategy",
            "SimpleStrategy",
        ])
        .unwrap();
        assert_eq!(parsed.value('f'), Some("data.xml"));
        assert_eq!(parsed.value('c'), Some("Test Cluster"));
        assert!(parsed.has_option('o'));
        assert_eq!(parsed.value('o'), None);
        assert_eq!(parsed.value('r'), Some("3"));
        assert_eq!(parsed.value('s'), Some("SimpleStrategy"));
    }

    #[test]
    fn test_only_schema_flag_is_recorded() {
        let parsed = parse_command_line(with(&["-o"])).unwrap();
        assert!(parsed.has_option('o'));
    }

    #[test]
    fn test_empty_arguments_request_usage() {
        assert_eq!(
            parse_command_line(Vec::<String>::new()),
            Err(CommandLineError::UsageRequested)
        );
    }

    #[test]
    fn test_each_missing_required_option_fails() {
        for missing in ["-f", "-h", "-p", "-c"] {
            let position = REQUIRED.iter().position(|a| *a == missing).unwrap();
            let mut args = REQUIRED.to_vec();
            args.drain(position..position + 2);
            let err = parse_command_line(args).unwrap_err();
            assert!(
                matches!(err, CommandLineError::Parse(_)),
                "{missing} should be required"
            );
        }
    }

    #[test]
    fn test_missing_value_fails() {
        let err = parse_command_line(with(&["-r"])).unwrap_err();
        assert!(matches!(err, CommandLineError::Parse(_)));
    }

    #[test]
    fn test_unknown_option_fails() {
        let err = parse_command_line(with(&["-z"])).unwrap_err();
        let CommandLineError::Parse(message) = err else {
            panic!("expected a parse error");
        };
        assert!(message.contains("-z"), "{message}");
        assert!(!message.starts_with("error:"));
    }

    #[test]
    fn test_repeated_options_are_accepted() {
        let parsed = parse_command_line(with(&["-o", "-o", "-f", "other.xml"])).unwrap();
        assert!(parsed.has_option('o'));
        assert_eq!(parsed.value('f'), Some("other.xml"));
    }

    #[test]
    fn test_stray_positional_fails() {
        let err = parse_command_line(with(&["extra"])).unwrap_err();
        assert!(matches!(err, CommandLineError::Parse(_)));
    }

    #[test]
    fn test_replication_factor_format_is_not_checked() {
        let parsed = parse_command_line(with(&["-r", "abc"])).unwrap();
        assert_eq!(parsed.value('r'), Some("abc"));
    }

    #[test]
    fn test_negative_replication_factor_is_a_value() {
        let parsed = parse_command_line(with(&["-r", "-1"])).unwrap();
        assert_eq!(parsed.value('r'), Some("-1"));
    }

    #[test]
    fn test_parses_are_independent() {
        let first = parse_command_line(with(&["-o", "-s", "NetworkTopologyStrategy"])).unwrap();
        let second = parse_command_line(with(&[])).unwrap();
        assert!(first.has_option('o'));
        assert!(!second.has_option('o'));
        assert!(!second.has_option('s'));
    }

    #[test]
    fn test_usage_lists_every_option() {
        let text = usage();
        assert!(text.starts_with("usage: load\n"));
        for spec in OPTION_SPECS {
            let line = text
                .lines()
                .find(|l| l.contains(&format!("-{},--{}", spec.short, spec.long)))
                .unwrap_or_else(|| panic!("no usage line for {}", spec.long));
            assert!(line.contains(spec.help));
        }
        assert_eq!(text.lines().count(), OPTION_SPECS.len() + 1);
    }
}
