use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::features::automation::ConditionOperator;
use crate::records::TargetModel;

#[derive(Parser)]
#[command(name = "autorule")]
#[command(about = "Conditional field automation for business records")]
#[command(long_about = "autorule - rules that fill in and correct records as they are saved

Rules pair a condition with an action for one kind of record (courier
requests, partners, sales orders, invoices). Whenever a record is created or
edited, every active rule for its kind runs in sequence order: if the
condition holds, the action writes to the record.

QUICK START:
  autorule rule create \"Heavy parcels\" --model courier-request \\
      --field weight --operator '>' --value 20 --set notes='heavy'
  autorule record create courier-request --set weight=25
  autorule rule list

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  autorule <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Act as this user id
    ///
    /// Overrides `general.current_user` from the config file. The acting
    /// user owns new courier requests and selects user-scoped rules.
    #[arg(short, long, global = true, env = "AUTORULE_USER")]
    pub user: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage automation rules
    ///
    /// Rules are stored as YAML files in ~/.autorule/rules/. Custom
    /// conditions and actions are checked when a rule is saved.
    ///
    /// # Examples
    ///
    ///   autorule rule list
    ///   autorule rule show "Heavy parcels"
    ///   autorule rule test "Heavy parcels"
    ///   autorule rule toggle "Heavy parcels" --disable
    #[command(alias = "r")]
    Rule(RuleArgs),

    /// Create, edit and inspect records
    ///
    /// Saving a record runs the rules for its model. Courier requests are
    /// also filled from the acting user's defaults.
    ///
    /// # Examples
    ///
    ///   autorule record create partner --set name='Acme' --set city=Lyon
    ///   autorule record update 4 --set user_id=2
    ///   autorule record list --model invoice
    Record(RecordArgs),

    /// Show or change auto-fill preferences
    ///
    /// Auto-fill only runs when both --auto-fill and --automation are on.
    ///
    /// # Examples
    ///
    ///   autorule --user 1 prefs set --auto-fill true --automation true
    ///   autorule --user 1 prefs set --sender 12 --tags 3,4
    ///   autorule --user 1 prefs show
    Prefs(PrefsArgs),

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   autorule completions zsh > ~/.zsh/completions/_autorule
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct RuleArgs {
    #[command(subcommand)]
    pub command: RuleCommands,
}

/// Rule subcommands.
#[derive(Subcommand)]
pub enum RuleCommands {
    /// List rules in execution order
    List {
        /// Only rules for this model
        #[arg(long, short = 'm')]
        model: Option<TargetModel>,
    },

    /// Show a rule's definition and statistics
    Show {
        /// Rule name
        name: String,
    },

    /// Create a rule
    ///
    /// Give either a field condition (--field/--operator/--value) or a
    /// custom one (--condition); without either the rule always applies.
    /// Give exactly one action: --set, --set-fields or --action.
    Create(CreateRuleArgs),

    /// Delete a rule
    Delete {
        /// Rule name
        name: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Enable or disable a rule
    ///
    /// Without a flag the current state is flipped.
    Toggle {
        /// Rule name
        name: String,

        /// Explicitly enable
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Explicitly disable
        #[arg(long)]
        disable: bool,
    },

    /// Check a rule's condition against a blank record
    ///
    /// Nothing is saved and the action does not run.
    Test {
        /// Rule name
        name: String,
    },

    /// Import rules from a YAML file
    ///
    /// Nothing is imported if any rule in the file is invalid.
    Import {
        /// Path to YAML file
        path: String,
    },

    /// Export rules as YAML
    Export {
        /// Output file (standard output when omitted)
        path: Option<String>,

        /// Rule names to export (all if not specified)
        #[arg(long, short = 'r', value_delimiter = ',')]
        rules: Option<Vec<String>>,
    },
}

#[derive(Args)]
pub struct CreateRuleArgs {
    /// Rule name
    pub name: String,

    /// Model the rule applies to
    #[arg(long, short = 'm')]
    pub model: TargetModel,

    /// Rule description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Execution order, lower runs first
    #[arg(long, short = 's', default_value_t = 10)]
    pub sequence: i32,

    /// Only for records owned by this user
    #[arg(long)]
    pub scope_user: Option<i64>,

    /// Save the rule disabled
    #[arg(long)]
    pub inactive: bool,

    /// Field compared by the condition
    #[arg(long, conflicts_with = "condition")]
    pub field: Option<String>,

    /// Comparison operator (=, !=, >, <, >=, <=, in, not in, contains, not contains)
    #[arg(long, default_value = "=")]
    pub operator: ConditionOperator,

    /// Literal the field is compared with
    #[arg(long, default_value = "")]
    pub value: String,

    /// Custom condition expression
    #[arg(long)]
    pub condition: Option<String>,

    /// Set one field: FIELD=VALUE
    #[arg(long, value_parser = parse_key_val, conflicts_with_all = ["set_fields", "action"])]
    pub set: Option<(String, String)>,

    /// Set several fields from a JSON object
    #[arg(long, conflicts_with = "action")]
    pub set_fields: Option<String>,

    /// Custom action: `field := expression; ...`
    #[arg(long)]
    pub action: Option<String>,
}

#[derive(Args)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub command: RecordCommands,
}

/// Record subcommands.
#[derive(Subcommand)]
pub enum RecordCommands {
    /// Create a record and run its rules
    Create {
        /// Record model
        model: TargetModel,

        /// Field values: FIELD=VALUE
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,

        /// Evaluate rules without executing actions
        #[arg(long)]
        dry_run: bool,
    },

    /// Edit a record and run its rules
    Update {
        /// Record id
        id: i64,

        /// Field values: FIELD=VALUE
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,

        /// Evaluate rules without executing actions
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a record
    Show {
        /// Record id
        id: i64,
    },

    /// List records, newest first
    List {
        /// Only records of this model
        #[arg(long, short = 'm')]
        model: Option<TargetModel>,
    },

    /// Show the default values a new record would get
    Defaults {
        /// Record model
        model: TargetModel,

        /// Fields to fill (all auto-fill fields if not specified)
        #[arg(long, short = 'f', value_delimiter = ',')]
        fields: Option<Vec<String>>,
    },
}

#[derive(Args)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub command: PrefsCommands,
}

/// Preference subcommands.
#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Show the acting user's preferences
    Show,

    /// Change the acting user's preferences
    ///
    /// Id options accept `none` to clear the default.
    Set {
        /// Fill courier requests from the defaults
        #[arg(long)]
        auto_fill: Option<bool>,

        /// Enable automation features
        #[arg(long)]
        automation: Option<bool>,

        /// Default sender partner id
        #[arg(long)]
        sender: Option<String>,

        /// Default courier type id
        #[arg(long)]
        courier_type: Option<String>,

        /// Default category id
        #[arg(long)]
        category: Option<String>,

        /// Default priority id
        #[arg(long)]
        priority: Option<String>,

        /// Default tag ids, comma separated
        #[arg(long)]
        tags: Option<String>,
    },
}

/// Parse a `KEY=VALUE` pair.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("notes=a=b").unwrap(),
            ("notes".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("notes").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_rule_create() {
        let cli = Cli::parse_from([
            "autorule",
            "rule",
            "create",
            "Heavy",
            "--model",
            "courier-request",
            "--field",
            "weight",
            "--operator",
            ">",
            "--value",
            "20",
            "--set",
            "notes=heavy",
        ]);

        let Commands::Rule(RuleArgs {
            command: RuleCommands::Create(args),
        }) = cli.command
        else {
            panic!("expected rule create");
        };
        assert_eq!(args.model, TargetModel::CourierRequest);
        assert_eq!(args.operator, ConditionOperator::GreaterThan);
        assert_eq!(args.set, Some(("notes".to_string(), "heavy".to_string())));
    }

    #[test]
    fn test_global_user_flag() {
        let cli = Cli::parse_from(["autorule", "prefs", "show", "--user", "3", "-o", "json"]);
        assert_eq!(cli.user, Some(3));
        assert_eq!(cli.output, Some(OutputFormat::Json));
    }
}
