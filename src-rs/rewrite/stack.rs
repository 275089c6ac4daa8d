use std::fmt;

use tracing::trace;

/// Rendered text of an expression that has been exited but not yet
/// consumed by its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// A bare `?`, possibly with casts applied to it directly. Left
    /// unrendered so an INSERT column can alias it.
    Placeholder { cast: Option<String> },
    Expr(String),
    /// A column name on the left hand side of a SET clause
    Name(String),
}

impl Fragment {
    fn kind(&self) -> &'static str {
        match self {
            Fragment::Placeholder { .. } => "placeholder",
            Fragment::Expr(_) => "expression",
            Fragment::Name(_) => "name",
        }
    }

    // A placeholder used as an operand is one element of a bound array
    pub fn into_operand(self) -> Option<String> {
        match self {
            Fragment::Placeholder { cast: None } => Some("unnest(?)".to_string()),
            Fragment::Placeholder { cast: Some(cast) } => Some(format!("unnest(?)::{}", cast)),
            Fragment::Expr(text) => Some(text),
            Fragment::Name(_) => None,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Placeholder { cast: None } => write!(f, "?"),
            Fragment::Placeholder { cast: Some(cast) } => write!(f, "?::{}", cast),
            Fragment::Expr(text) | Fragment::Name(text) => write!(f, "{}", text),
        }
    }
}

/// The listener popped more fragments than the walker pushed, or found a
/// fragment of the wrong kind. Either way the listener and the grammar
/// disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackError {
    Underflow {
        rule: &'static str,
        stack: Vec<Fragment>,
    },
    TypeMismatch {
        rule: &'static str,
        expected: &'static str,
        found: Fragment,
        stack: Vec<Fragment>,
    },
    Leftover {
        rule: &'static str,
        stack: Vec<Fragment>,
    },
}

fn render_stack(stack: &[Fragment]) -> String {
    let fragments: Vec<String> = stack.iter().map(|f| format!("`{}`", f)).collect();
    format!("[{}]", fragments.join(", "))
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Underflow { rule, stack } => write!(
                f,
                "stack underflow in {}, stack: {}",
                rule,
                render_stack(stack)
            ),
            StackError::TypeMismatch {
                rule,
                expected,
                found,
                stack,
            } => write!(
                f,
                "expected {} in {}, found {} `{}`, stack: {}",
                expected,
                rule,
                found.kind(),
                found,
                render_stack(stack)
            ),
            StackError::Leftover { rule, stack } => write!(
                f,
                "fragments left over after {}, stack: {}",
                rule,
                render_stack(stack)
            ),
        }
    }
}

impl std::error::Error for StackError {}

#[derive(Debug, Default)]
pub struct FragmentStack {
    fragments: Vec<Fragment>,
}

impl FragmentStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: Fragment) {
        trace!(fragment = %fragment, depth = self.fragments.len() + 1, "push");
        self.fragments.push(fragment);
    }

    pub fn pop(&mut self, rule: &'static str) -> Result<Fragment, StackError> {
        match self.fragments.pop() {
            Some(fragment) => {
                trace!(rule = rule, fragment = %fragment, depth = self.fragments.len(), "pop");
                Ok(fragment)
            }
            None => Err(StackError::Underflow {
                rule,
                stack: Vec::new(),
            }),
        }
    }

    /// Pops the top `count` fragments, returned in push order.
    pub fn pop_n(&mut self, count: usize, rule: &'static str) -> Result<Vec<Fragment>, StackError> {
        if count > self.fragments.len() {
            return Err(StackError::Underflow {
                rule,
                stack: self.fragments.clone(),
            });
        }
        let mut popped = Vec::with_capacity(count);
        for _ in 0..count {
            popped.push(self.pop(rule)?);
        }
        popped.reverse();
        Ok(popped)
    }

    pub fn pop_operand(&mut self, rule: &'static str) -> Result<String, StackError> {
        let fragment = self.pop(rule)?;
        self.operand(fragment, rule)
    }

    pub fn pop_operands(&mut self, count: usize, rule: &'static str) -> Result<Vec<String>, StackError> {
        self.pop_n(count, rule)?
            .into_iter()
            .map(|fragment| self.operand(fragment, rule))
            .collect()
    }

    pub fn pop_name(&mut self, rule: &'static str) -> Result<String, StackError> {
        match self.pop(rule)? {
            Fragment::Name(name) => Ok(name),
            found => Err(self.mismatch(rule, "name", found)),
        }
    }

    pub fn ensure_empty(&self, rule: &'static str) -> Result<(), StackError> {
        if self.fragments.is_empty() {
            Ok(())
        } else {
            Err(StackError::Leftover {
                rule,
                stack: self.fragments.clone(),
            })
        }
    }

    fn operand(&self, fragment: Fragment, rule: &'static str) -> Result<String, StackError> {
        match fragment.clone().into_operand() {
            Some(text) => Ok(text),
            None => Err(self.mismatch(rule, "expression", fragment)),
        }
    }

    fn mismatch(&self, rule: &'static str, expected: &'static str, found: Fragment) -> StackError {
        StackError::TypeMismatch {
            rule,
            expected,
            found,
            stack: self.fragments.clone(),
        }
    }
}
