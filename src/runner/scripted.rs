//! In-memory [`CommandRunner`] double for scenario tests.
//!
//! Replies are matched by command-line prefix. Several replies registered for
//! the same prefix are consumed in order; the last one then repeats.
//! Commands with no matching rule succeed with empty output.

use super::{CommandResult, CommandRunner, CommandSpec};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Scripted reply for a matching command
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit 0 with the given stdout
    Ok(String),
    /// Exit with the given code and stderr
    Fail(i32, String),
    /// Fire the interrupt token and block until the caller gives up
    Interrupt,
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    replies: VecDeque<Reply>,
}

/// Runner that returns configured results and records every invocation
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    missing_tools: Mutex<HashSet<String>>,
    interrupt: Option<CancellationToken>,
}

impl ScriptedRunner {
    /// Runner where every command succeeds with empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the token that [`Reply::Interrupt`] cancels
    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = Some(token);
        self
    }

    /// Queue a reply for commands whose command line starts with `prefix`
    pub fn on(self, prefix: &str, reply: Reply) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            match rules.iter_mut().find(|r| r.prefix == prefix) {
                Some(rule) => rule.replies.push_back(reply),
                None => rules.push(Rule {
                    prefix: prefix.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Make a tool look absent from PATH
    pub fn without_tool(self, tool: &str) -> Self {
        if let Ok(mut missing) = self.missing_tools.lock() {
            missing.insert(tool.to_string());
        }
        self
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether any recorded command line starts with `prefix`
    pub fn ran(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    /// Index of the first recorded command line starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    fn next_reply(&self, line: &str) -> Option<Reply> {
        let mut rules = self.rules.lock().ok()?;
        let rule = rules
            .iter_mut()
            .filter(|r| line.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())?;
        if rule.replies.len() > 1 {
            rule.replies.pop_front()
        } else {
            rule.replies.front().cloned()
        }
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> CommandResult {
        let line = command.to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }

        match self.next_reply(&line) {
            None => CommandResult::success(""),
            Some(Reply::Ok(stdout)) => CommandResult::success(stdout),
            Some(Reply::Fail(code, stderr)) => CommandResult::failure(code, stderr),
            Some(Reply::Interrupt) => {
                if let Some(token) = &self.interrupt {
                    token.cancel();
                }
                std::future::pending::<CommandResult>().await
            }
        }
    }

    fn tool_available(&self, tool: &str) -> bool {
        self.missing_tools
            .lock()
            .map(|m| !m.contains(tool))
            .unwrap_or(true)
    }
}
