use bindery_derive::bindery_error;
use std::borrow::Cow;

#[bindery_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<String, DemoError> {
    std::fs::read_to_string("/definitely/not/here").context("reading demo file")
}

fn main() {
    let err: DemoError = "broken".into();
    assert!(matches!(err, DemoError::Internal { .. }));
    assert!(read().is_err());
}
