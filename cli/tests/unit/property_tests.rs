//! Property-based tests for the pure text transforms.

#![allow(clippy::unwrap_used)]

use hostkit_cli::domain::config::DeployConfig;
use hostkit_cli::domain::edit::{self, Replacement};
use hostkit_cli::domain::poll::PollSpec;
use hostkit_cli::domain::shell::{SessionContext, quote};
use hostkit_cli::domain::template;
use proptest::prelude::*;

proptest! {
    /// Applying the same replacements twice changes the file only once.
    #[test]
    fn edits_apply_at_most_once(
        prefix in "[m-o]{0,10}",
        suffix in "[m-o]{0,10}",
        old in "[a-c]{3,6}",
        new in "[x-z]{3,6}",
    ) {
        let content = format!("{prefix}\n{old}\n{suffix}");
        let pairs = [Replacement::new(old.clone(), new.clone())];
        let first = edit::apply("f", &content, &pairs).unwrap();
        prop_assert!(first.changed());
        prop_assert!(!first.content.contains(&old));
        let second = edit::apply("f", &first.content, &pairs).unwrap();
        prop_assert!(!second.changed());
        prop_assert_eq!(second.content, first.content);
    }

    /// Quoted strings never leave an unbalanced single quote.
    #[test]
    fn quote_balances_single_quotes(s in "[^\\\\]{0,40}") {
        let quoted = quote(&s);
        let bare = quoted.replace(r"'\''", "");
        prop_assert_eq!(bare.matches('\'').count() % 2, 0);
    }

    /// Plain words pass through unquoted.
    #[test]
    fn quote_keeps_plain_words(s in "[a-zA-Z0-9_./-]{1,30}") {
        prop_assert_eq!(quote(&s), s);
    }

    /// A wrapped command always ends with the command itself.
    #[test]
    fn wrap_ends_with_command(dir in "/[a-z]{1,10}", cmd in "[a-z ]{1,20}") {
        let ctx = SessionContext::default().with_working_dir(Some(&dir));
        let wrapped = ctx.wrap(&cmd);
        prop_assert!(wrapped.ends_with(&cmd));
        let expected_prefix = format!("cd {dir} && ");
        prop_assert!(wrapped.starts_with(&expected_prefix));
    }

    /// Rendering substitutes configuration values verbatim.
    #[test]
    fn render_substitutes_values(value in "[a-zA-Z0-9 .:/-]{0,30}") {
        let doc = format!("name = {}\n", toml_string(&value));
        let config = DeployConfig::parse(&doc).unwrap();
        let rendered = template::render("t", "host: {{ name }}\n", &config).unwrap();
        prop_assert_eq!(rendered, format!("host: {value}\n"));
    }

    /// The poll budget is (attempts - 1) sleeps.
    #[test]
    fn poll_budget_counts_sleeps_between_probes(attempts in 1u32..100, interval in 1u64..30) {
        let spec = PollSpec::new(
            "kubectl get certificate",
            "True",
            std::time::Duration::from_secs(interval),
            attempts,
        );
        prop_assert_eq!(spec.budget().as_secs(), u64::from(attempts - 1) * interval);
    }
}

fn toml_string(s: &str) -> String {
    format!("\"{s}\"")
}
