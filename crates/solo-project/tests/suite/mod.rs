mod discovery;
mod lifecycle;
mod support;
mod synthesis;
