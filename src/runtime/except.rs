//! Error and control-flow signalling
//!
//! Logo uses one unwinding mechanism for two very different things: real
//! errors, and the non-local control transfers `stop` / `output` / `throw`.
//! [`Flow`] keeps them in one `Err` channel (so `?` propagates everything)
//! while forcing every catch boundary to say explicitly which variants it
//! absorbs. A generic error handler can therefore never swallow a control
//! signal by accident.

use crate::runtime::value::Value;
use crate::util::span::SrcRef;
use std::rc::Rc;

/// The closed set of engine error codes
///
/// Each code maps to a message template with positional `{n}` substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Internal inconsistency; should not surface in normal use
    Fatal,
    /// `I don't know how to {0}`
    DontKnowHow,
    /// `{0} didn't output to {1}`
    NoOutput,
    /// `not enough inputs to {0}`
    NotEnoughInputs,
    /// `too many inputs to {0}`
    TooManyInputs,
    /// `You don't say what to do with {0}`
    DontSayWhatToDo,
    /// `{0} doesn't like {1} as input`
    InvalidInput,
    /// `{0} has no value`
    NoValue,
    /// `unexpected {0}`
    UnexpectedToken,
    /// `{0} is a primitive`
    IsPrimitive,
    /// `Can't use {0} here`
    CantUseHere,
    /// `{0} is out of range`
    IndexOutOfRange,
    /// `division by zero`
    DivisionByZero,
    /// `Can't find catch tag for {0}`
    NoCatchTag,
    /// `Can only use {0} inside a procedure`
    NotInsideProcedure,
    /// `{0} is already defined in module {1}`
    AlreadyDefined,
    /// `I don't know about module {0}`
    UnknownModule,
    /// `{0} does not export {1}`
    NotExported,
    /// `Couldn't read file {0}`
    CantOpenFile,
    /// `call stack too deep in {0}`
    StackOverflow,
}

impl ErrorCode {
    /// Stable numeric code, as surfaced by the `error` primitive
    pub fn number(self) -> u32 {
        match self {
            ErrorCode::Fatal => 0,
            ErrorCode::DontKnowHow => 1,
            ErrorCode::NoOutput => 2,
            ErrorCode::NotEnoughInputs => 3,
            ErrorCode::TooManyInputs => 4,
            ErrorCode::DontSayWhatToDo => 5,
            ErrorCode::InvalidInput => 6,
            ErrorCode::NoValue => 7,
            ErrorCode::UnexpectedToken => 8,
            ErrorCode::IsPrimitive => 9,
            ErrorCode::CantUseHere => 10,
            ErrorCode::IndexOutOfRange => 11,
            ErrorCode::DivisionByZero => 12,
            ErrorCode::NoCatchTag => 13,
            ErrorCode::NotInsideProcedure => 14,
            ErrorCode::AlreadyDefined => 15,
            ErrorCode::UnknownModule => 16,
            ErrorCode::NotExported => 17,
            ErrorCode::CantOpenFile => 18,
            ErrorCode::StackOverflow => 19,
        }
    }

    /// Message template for this code (positional `{n}` substitution)
    pub fn template(self) -> &'static str {
        match self {
            ErrorCode::Fatal => "internal error: {0}",
            ErrorCode::DontKnowHow => "I don't know how to {0}",
            ErrorCode::NoOutput => "{0} didn't output to {1}",
            ErrorCode::NotEnoughInputs => "not enough inputs to {0}",
            ErrorCode::TooManyInputs => "too many inputs to {0}",
            ErrorCode::DontSayWhatToDo => "You don't say what to do with {0}",
            ErrorCode::InvalidInput => "{0} doesn't like {1} as input",
            ErrorCode::NoValue => "{0} has no value",
            ErrorCode::UnexpectedToken => "unexpected {0}",
            ErrorCode::IsPrimitive => "{0} is a primitive",
            ErrorCode::CantUseHere => "Can't use {0} here",
            ErrorCode::IndexOutOfRange => "{0} is out of range",
            ErrorCode::DivisionByZero => "division by zero",
            ErrorCode::NoCatchTag => "Can't find catch tag for {0}",
            ErrorCode::NotInsideProcedure => "Can only use {0} inside a procedure",
            ErrorCode::AlreadyDefined => "{0} is already defined in module {1}",
            ErrorCode::UnknownModule => "I don't know about module {0}",
            ErrorCode::NotExported => "{0} does not export {1}",
            ErrorCode::CantOpenFile => "Couldn't read file {0}",
            ErrorCode::StackOverflow => "call stack too deep in {0}",
        }
    }
}

/// A Logo runtime or structural error
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", self.render())]
pub struct LogoError {
    /// Error code from the closed table
    pub code: ErrorCode,
    /// Display forms of the offending values, substituted positionally
    pub args: Vec<String>,
    /// Source position, when known
    pub at: Option<SrcRef>,
    /// Procedure the error was raised in, when known
    pub proc_name: Option<String>,
    /// Logo call chain captured at the first procedure boundary the
    /// error unwound through (innermost first)
    pub chain: Vec<String>,
}

impl LogoError {
    /// Create an error with no substitution arguments
    pub fn bare(code: ErrorCode) -> Self {
        Self {
            code,
            args: Vec::new(),
            at: None,
            proc_name: None,
            chain: Vec::new(),
        }
    }

    /// Create an error with substitution arguments
    pub fn new<S: Into<String>>(code: ErrorCode, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            code,
            args: args.into_iter().map(Into::into).collect(),
            at: None,
            proc_name: None,
            chain: Vec::new(),
        }
    }

    /// Attach a source position if one is not already set
    pub fn at(mut self, at: SrcRef) -> Self {
        if self.at.is_none() && !at.is_dummy() {
            self.at = Some(at);
        }
        self
    }

    /// Attach the raising procedure's name if not already set
    pub fn in_proc(mut self, name: &str) -> Self {
        if self.proc_name.is_none() {
            self.proc_name = Some(name.to_string());
        }
        self
    }

    /// Render the message template with the substitution arguments
    pub fn render(&self) -> String {
        let mut out = String::new();
        let template = self.code.template();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' {
                let mut idx = 0usize;
                let mut digits = false;
                while let Some(&d) = chars.peek() {
                    if let Some(v) = d.to_digit(10) {
                        idx = idx * 10 + v as usize;
                        digits = true;
                        chars.next();
                    } else {
                        break;
                    }
                }
                if digits && chars.peek() == Some(&'}') {
                    chars.next();
                    out.push_str(self.args.get(idx).map(String::as_str).unwrap_or("?"));
                    continue;
                }
                out.push(c);
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Non-local unwinding: errors plus the control-flow pseudo-exceptions
///
/// `Stop` and `Output` unwind to the nearest procedure or lambda boundary;
/// `Throw` unwinds to a `catch` with a matching tag; `Err` unwinds to a
/// `catch "error`. `Bye` tears down the whole session.
#[derive(Debug, Clone)]
pub enum Flow {
    /// A genuine error
    Err(LogoError),
    /// `stop`: return from the current procedure with no value
    Stop,
    /// `output v`: return `v` from the current procedure
    Output(Value),
    /// `throw "tag` with an optional carried value
    Throw {
        /// Catch tag, matched case-insensitively
        tag: Rc<str>,
        /// Value the matching catch yields
        value: Option<Value>,
        /// Procedure that threw, for stack reporting
        from: Option<String>,
    },
    /// `bye`: leave the session
    Bye,
}

impl Flow {
    /// Attach a source position to an error flow that has none yet;
    /// control signals pass through untouched
    pub fn with_at(self, at: SrcRef) -> Self {
        match self {
            Flow::Err(e) => Flow::Err(e.at(at)),
            other => other,
        }
    }

    /// Shorthand for a bare error flow
    pub fn err(code: ErrorCode) -> Self {
        Flow::Err(LogoError::bare(code))
    }

    /// Shorthand for an error flow with arguments
    pub fn err_with<S: Into<String>>(
        code: ErrorCode,
        args: impl IntoIterator<Item = S>,
    ) -> Self {
        Flow::Err(LogoError::new(code, args))
    }
}

impl From<LogoError> for Flow {
    fn from(e: LogoError) -> Self {
        Flow::Err(e)
    }
}

/// Result alias threaded through the whole evaluation core
pub type EvalResult<T> = Result<T, Flow>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_substitution() {
        let err = LogoError::new(ErrorCode::InvalidInput, ["first", "[]"]);
        assert_eq!(err.render(), "first doesn't like [] as input");
    }

    #[test]
    fn test_template_missing_arg() {
        let err = LogoError::bare(ErrorCode::NoValue);
        assert_eq!(err.render(), "? has no value");
    }

    #[test]
    fn test_at_keeps_first_position() {
        let first = SrcRef::new(0, 1, 2);
        let second = SrcRef::new(0, 9, 9);
        let err = LogoError::bare(ErrorCode::DivisionByZero).at(first).at(second);
        assert_eq!(err.at, Some(first));
    }
}
