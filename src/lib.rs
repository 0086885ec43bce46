pub mod completion;
pub mod document;
pub mod exml;
pub mod logging;
pub mod lsp;
pub mod sax;
