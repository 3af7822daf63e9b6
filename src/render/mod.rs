//!
//! storefront render module
//! -------------------------
//! Turns a template name plus request context into finished HTML for one tenant.
//!
//! - `loader`: ordered template providers (tenant database first, shared filesystem
//!   root second) and the async prefetch that feeds the synchronous engine.
//! - `environment`: one configured `minijinja` environment per (tenant, theme).
//! - `filters`: filters and fragment globals registered on every environment.
//! - `styles`: the three-tier style precedence merge.
//! - `shortcodes`: post-render widget/block substitution, permission-gated.
//! - `pipeline`: context assembly plus the error-page fallback.

pub mod environment;
pub mod filters;
pub mod loader;
pub mod pipeline;
pub mod shortcodes;
pub mod styles;

pub use environment::{EnvironmentCache, ThemeEnvironment};
pub use loader::{DatabaseProvider, FilesystemProvider, TemplateLoader, TemplateProvider};
pub use pipeline::{RenderPipeline, RenderRequest, Rendered};
pub use shortcodes::{process_shortcodes, FragmentKind, FragmentSource, StoreFragments};
pub use styles::resolve_styles;
