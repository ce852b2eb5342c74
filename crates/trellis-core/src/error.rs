use thiserror::Error;

/// Errors surfaced by the host at its public boundary (`render`, `flush`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// A render body or layout effect panicked. `component` is the key of the
    /// innermost instance that was rendering.
    #[error("render of `{component}` panicked: {message}")]
    RenderPanicked { component: String, message: String },

    #[error("tree did not settle after {passes} render passes; an effect or render body keeps forcing updates")]
    RenderLoop { passes: usize },

    #[error("hooks can only be called while a component is rendering")]
    OutsideRender,
}

/// Misconfiguration of a selective-subscription context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("`{context}` was read without an enclosing provider; render it inside `Context::provider`")]
    MissingProvider { context: &'static str },
}
