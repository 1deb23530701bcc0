//! GNU parallel style command templates.
//!
//! For the input `t/example.tar.gz` the placeholders expand to:
//!
//! | token  | value              |
//! |--------|--------------------|
//! | `{}`   | `t/example.tar.gz` |
//! | `{.}`  | `t/example.tar`    |
//! | `{_}`  | `t/example`        |
//! | `{/}`  | `example.tar.gz`   |
//! | `{/.}` | `example.tar`      |
//! | `{/_}` | `example`          |
//! | `{#}`  | zero-based sequence number |
//!
//! A template without `{}` gets the input appended as its last argument.

use std::io::BufRead;

use glob::glob;
use tracing::debug;

use crate::config::GridOpts;
use crate::error::Result;
use crate::job::JobSpec;

/// Separates the command template from its inputs on the command line.
pub const INPUT_SEPARATOR: &str = ":::";

/// Everything a placeholder can expand to for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub full: String,
    pub no_ext: String,
    pub first_part: String,
    pub base_name: String,
    pub base_no_ext: String,
    pub base_first_part: String,
    pub index: usize,
}

impl TemplateContext {
    pub fn new(token: &str, index: usize) -> Self {
        let full = token.trim();
        let (dir, base) = split_path(full);
        let base_first_part = base.split('.').next().unwrap_or(base);

        Self {
            full: full.to_string(),
            no_ext: strip_ext(full).to_string(),
            first_part: join_path(dir, base_first_part),
            base_name: base.to_string(),
            base_no_ext: strip_ext(base).to_string(),
            base_first_part: base_first_part.to_string(),
            index,
        }
    }

    fn lookup(&self, placeholder: &str) -> Option<String> {
        let value = match placeholder {
            "{}" => &self.full,
            "{.}" => &self.no_ext,
            "{_}" => &self.first_part,
            "{/}" => &self.base_name,
            "{/.}" => &self.base_no_ext,
            "{/_}" => &self.base_first_part,
            "{#}" => return Some(self.index.to_string()),
            _ => return None,
        };
        Some(value.clone())
    }
}

const PLACEHOLDERS: [&str; 7] = ["{}", "{.}", "{_}", "{/}", "{/.}", "{/_}", "{#}"];

fn strip_ext(s: &str) -> &str {
    s.rsplit_once('.').map_or(s, |(stem, _)| stem)
}

/// Directory and file name, with redundant trailing slashes dropped from
/// the directory unless it is the root.
fn split_path(s: &str) -> (&str, &str) {
    match s.rfind('/') {
        Some(i) => {
            let head = &s[..=i];
            let trimmed = head.trim_end_matches('/');
            let dir = if trimmed.is_empty() { head } else { trimmed };
            (dir, &s[i + 1..])
        }
        None => ("", s),
    }
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Decides where a finalized command sends its output.
pub trait RedirectSplit {
    /// Returns the command proper and the output target, if any.
    fn split(&self, command: &str) -> (String, Option<String>);
}

/// Splits on the first `>` with no regard for quoting.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstRedirect;

impl RedirectSplit for FirstRedirect {
    fn split(&self, command: &str) -> (String, Option<String>) {
        match command.split_once('>') {
            Some((cmd, target)) => {
                let target = target.trim();
                let target = (!target.is_empty()).then(|| target.to_string());
                (cmd.trim().to_string(), target)
            }
            None => (command.trim().to_string(), None),
        }
    }
}

/// A command for one input, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub command: String,
    pub output_file: Option<String>,
}

impl Expansion {
    /// Output and error share the redirect target.
    pub fn into_spec(self, opts: &GridOpts) -> JobSpec {
        JobSpec::new(self.command)
            .grid_opts(opts)
            .output_file(self.output_file.clone())
            .error_file(self.output_file)
    }
}

#[derive(Debug, Clone)]
pub struct Template<S = FirstRedirect> {
    text: String,
    splitter: S,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_splitter(text, FirstRedirect)
    }
}

impl<S: RedirectSplit> Template<S> {
    pub fn with_splitter(text: impl Into<String>, splitter: S) -> Self {
        Self {
            text: text.into(),
            splitter,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn expand(&self, token: &str, index: usize) -> Expansion {
        let ctx = TemplateContext::new(token, index);
        let mut command = substitute(&self.text, &ctx);
        if !self.text.contains("{}") {
            command.push(' ');
            command.push_str(&ctx.full);
        }

        let (command, output_file) = self.splitter.split(&command);
        Expansion {
            command,
            output_file,
        }
    }

    pub fn expand_all<'a>(
        &'a self,
        tokens: &'a [String],
    ) -> impl Iterator<Item = Expansion> + 'a {
        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| self.expand(token, index))
    }
}

/// Replaces placeholders in one left-to-right pass, so text coming from
/// the input is never expanded again.
fn substitute(text: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let hit = PLACEHOLDERS
            .iter()
            .find(|p| rest.starts_with(**p))
            .and_then(|p| ctx.lookup(p).map(|value| (p.len(), value)));
        match hit {
            Some((len, value)) => {
                out.push_str(&value);
                rest = &rest[len..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Where input tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Tokens listed after `:::`.
    Args(Vec<String>),
    /// One token per line of standard input.
    Stdin,
}

impl InputSource {
    /// Splits `run` arguments into the template and its input source.
    pub fn from_args(args: &[String]) -> (Template, InputSource) {
        match args.iter().position(|a| a == INPUT_SEPARATOR) {
            Some(i) => {
                let mut tokens = args[i + 1..].to_vec();
                if tokens.is_empty() {
                    tokens.push(String::new());
                }
                (Template::new(args[..i].join(" ")), InputSource::Args(tokens))
            }
            None => (Template::new(args.join(" ")), InputSource::Stdin),
        }
    }

    /// Collects the tokens, reading `stdin` only for [`InputSource::Stdin`].
    pub fn tokens(self, stdin: impl BufRead) -> Result<Vec<String>> {
        match self {
            InputSource::Args(args) => expand_inputs(&args),
            InputSource::Stdin => {
                let mut tokens = Vec::new();
                for line in stdin.lines() {
                    let line = line?;
                    if !line.trim().is_empty() {
                        tokens.push(line);
                    }
                }
                Ok(tokens)
            }
        }
    }
}

/// Expands glob patterns the shell left alone. Tokens that match nothing,
/// or are not valid patterns at all, are kept as literal tokens.
fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();

    for pattern in patterns {
        let entries = match has_glob_meta(pattern).then(|| glob(pattern)) {
            Some(Ok(entries)) => entries,
            Some(Err(e)) => {
                debug!("keeping {:?} as a literal input: {}", pattern, e);
                out.push(pattern.clone());
                continue;
            }
            None => {
                out.push(pattern.clone());
                continue;
            }
        };

        let mut matched = Vec::new();
        for entry in entries {
            matched.push(entry?.to_string_lossy().into_owned());
        }
        if matched.is_empty() {
            out.push(pattern.clone());
        } else {
            out.extend(matched);
        }
    }

    Ok(out)
}

fn has_glob_meta(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[')
}
