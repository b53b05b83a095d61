//! Scripted command runner for adapter tests

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::domain::ports::{CommandError, CommandOutput, CommandRunner, Invocation};

struct Rule {
    tokens: Vec<String>,
    responses: VecDeque<CommandOutput>,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        let argv = invocation.argv();
        self.tokens
            .iter()
            .all(|t| *t == invocation.program || argv.contains(&t.as_str()))
    }

    /// Pop the next response, repeating the last one forever
    fn respond(&mut self) -> CommandOutput {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or_default()
        } else {
            self.responses.front().cloned().unwrap_or_default()
        }
    }
}

/// Answers commands from rules registered with [`ScriptedRunner::on`].
///
/// A rule matches when every token is the program name or one of the
/// arguments. The most recently added matching rule wins. Unmatched
/// commands fail with "unscripted command".
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, tokens: &[&str], output: CommandOutput) -> &Self {
        self.on_sequence(tokens, vec![output])
    }

    pub fn on_sequence(&self, tokens: &[&str], outputs: Vec<CommandOutput>) -> &Self {
        self.rules.borrow_mut().push(Rule {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            responses: outputs.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::display).collect()
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls containing every token
    pub fn count(&self, tokens: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| {
                tokens
                    .iter()
                    .all(|t| *t == inv.program || inv.has_arg(t))
            })
            .count()
    }

    fn answer(&self, invocation: &Invocation) -> CommandOutput {
        self.calls.borrow_mut().push(invocation.clone());
        let mut rules = self.rules.borrow_mut();
        match rules.iter_mut().rev().find(|r| r.matches(invocation)) {
            Some(rule) => rule.respond(),
            None => CommandOutput::failed(format!("unscripted command: {}", invocation.display())),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        Ok(self.answer(invocation))
    }

    fn run_streaming(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        let mut output = self.answer(invocation);
        output.stdout.clear();
        Ok(output)
    }
}
