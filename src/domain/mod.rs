mod run;

#[cfg(test)]
mod tests;

pub use run::{
    DEFAULT_CONTENT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, Endpoint, RunConfig,
};
