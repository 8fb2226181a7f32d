//! POSIX shell quoting and per-session command wrapping.
//!
//! Pure string manipulation; nothing here runs a process.

use std::collections::BTreeMap;

/// Single-quote `s` for a POSIX shell.
#[must_use]
pub fn quote(s: &str) -> String {
    let plain = |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ',')
    };
    if !s.is_empty() && s.chars().all(plain) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Quote a path or value, keeping a leading `~` expandable on the remote side.
#[must_use]
pub fn quote_path(s: &str) -> String {
    if s == "~" {
        return "\"$HOME\"".to_string();
    }
    match s.strip_prefix("~/") {
        Some("") => "\"$HOME\"/".to_string(),
        Some(rest) => format!("\"$HOME\"/{}", quote(rest)),
        None => quote(s),
    }
}

/// Working directory and environment applied to every remote command.
///
/// Values are replaced wholesale through the `with_*` builders; the
/// session owning a context swaps it through `&mut self`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    working_dir: Option<String>,
    env: BTreeMap<String, String>,
}

impl SessionContext {
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<&str>) -> Self {
        self.working_dir = dir.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_owned(), value.to_owned());
        self
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Prefix `command` with `cd` and `export` for this context.
    ///
    /// ```
    /// use hostkit_cli::domain::shell::SessionContext;
    /// let ctx = SessionContext::default()
    ///     .with_working_dir(Some("~/tmp"))
    ///     .with_env("KUBECONFIG", "~/.kube/config");
    /// assert_eq!(
    ///     ctx.wrap("kubectl get nodes"),
    ///     "cd \"$HOME\"/tmp && export KUBECONFIG=\"$HOME\"/.kube/config && kubectl get nodes"
    /// );
    /// ```
    #[must_use]
    pub fn wrap(&self, command: &str) -> String {
        let mut parts = Vec::with_capacity(self.env.len() + 2);
        if let Some(dir) = &self.working_dir {
            parts.push(format!("cd {}", quote_path(dir)));
        }
        for (name, value) in &self.env {
            parts.push(format!("export {name}={}", quote_path(value)));
        }
        parts.push(command.to_string());
        parts.join(" && ")
    }
}
