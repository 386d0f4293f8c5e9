use crate::error::{LingError, Result, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a frame. Frames live as long as the call that made them
/// or any closure that captured them.
pub type EnvRef = Rc<RefCell<Environment>>;

/// One lexical frame: a name→value map plus an optional enclosing frame.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root frame with no enclosing link.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh child of `enclosing` in a shareable handle.
    pub fn child_of(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Bind `name` in this frame, replacing any previous binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then outward until the chain is exhausted.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(LingError::runtime(
                name.line,
                RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
            ))
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(LingError::runtime(
                name.line,
                RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
            ))
        }
    }

    /// The frame exactly `distance` links outward from `env`.
    ///
    /// # Panics
    /// If the chain is shorter than `distance`; the resolver never produces
    /// such a distance.
    pub fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
        let mut frame = Rc::clone(env);

        for _ in 0..distance {
            let next = match &frame.borrow().enclosing {
                Some(enclosing) => Rc::clone(enclosing),
                None => panic!("environment chain shorter than resolved distance {}", distance),
            };
            frame = next;
        }

        frame
    }

    /// Read `name` from the frame `distance` links outward.
    ///
    /// # Panics
    /// If that frame does not bind `name`: resolved distances always point
    /// at the declaring frame.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str) -> Value {
        debug!("get_at distance={} name={}", distance, name);

        let frame = Self::ancestor(env, distance);
        let value = frame.borrow().values.get(name).cloned();

        match value {
            Some(value) => value,
            None => panic!("resolved variable '{}' missing at distance {}", name, distance),
        }
    }

    /// Overwrite `name` in the frame `distance` links outward.
    pub fn assign_at(env: &EnvRef, distance: usize, name: &Token, value: Value) {
        debug!("assign_at distance={} name={}", distance, name.lexeme);

        let frame = Self::ancestor(env, distance);
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(&name.lexeme) {
            Some(slot) => *slot = value,
            None => panic!(
                "resolved variable '{}' missing at distance {}",
                name.lexeme, distance
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn inner_frame_shadows_outer() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::from("global"));

        let inner = Environment::child_of(&globals);
        inner.borrow_mut().define("a", Value::from("local"));

        assert_eq!(inner.borrow().get(&ident("a")).map(|v| v.to_string()).ok(), Some("local".into()));
        assert_eq!(Environment::get_at(&inner, 1, "a").to_string(), "global");
    }

    #[test]
    fn assign_walks_outward_and_undefined_is_an_error() {
        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("n", Value::Number(1.0));
        let inner = Environment::child_of(&globals);

        assert!(inner.borrow_mut().assign(&ident("n"), Value::Number(2.0)).is_ok());
        assert_eq!(globals.borrow().get(&ident("n")).map(|v| v.to_string()).ok(), Some("2".into()));

        let err = inner
            .borrow_mut()
            .assign(&ident("missing"), Value::Nil)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");
    }

    #[test]
    fn assign_at_targets_exact_frame() {
        let outer: EnvRef = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x", Value::Number(1.0));
        let middle = Environment::child_of(&outer);
        middle.borrow_mut().define("x", Value::Number(2.0));
        let inner = Environment::child_of(&middle);

        Environment::assign_at(&inner, 2, &ident("x"), Value::Number(9.0));

        assert_eq!(Environment::get_at(&inner, 2, "x").to_string(), "9");
        assert_eq!(Environment::get_at(&inner, 1, "x").to_string(), "2");
    }

    #[test]
    #[should_panic(expected = "missing at distance")]
    fn distance_miss_is_an_invariant_violation() {
        let env: EnvRef = Rc::new(RefCell::new(Environment::new()));
        Environment::get_at(&env, 0, "nope");
    }
}
