//! The supported EXML UI dialects.
//!
//! Each dialect fixes a pair of well-known namespaces (the UI component
//! namespace and the work namespace for tooling attributes), the package
//! prefix of its component library, and a handful of pass-through types.

use once_cell::sync::Lazy;

use crate::sax::Namespace;

static EUI_NS: Lazy<Namespace> = Lazy::new(|| Namespace::new("e", "http://ns.egret.com/eui"));
static EUI_WORK_NS: Lazy<Namespace> = Lazy::new(|| Namespace::new("w", "http://ns.egret.com/wing"));
static GUI_NS: Lazy<Namespace> =
    Lazy::new(|| Namespace::new("e", "http://ns.egret-labs.org/egret"));
static GUI_WORK_NS: Lazy<Namespace> =
    Lazy::new(|| Namespace::new("w", "http://ns.egret-labs.org/wing"));

/// UI dialect of an EXML project. The set is closed; dialect-specific
/// behavior dispatches on this enum rather than on strategy objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Eui,
    Gui,
}

impl Dialect {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "eui" => Some(Dialect::Eui),
            "gui" => Some(Dialect::Gui),
            _ => None,
        }
    }

    /// The dialect's UI component namespace.
    pub fn ui_ns(self) -> &'static Namespace {
        match self {
            Dialect::Eui => &EUI_NS,
            Dialect::Gui => &GUI_NS,
        }
    }

    /// The work namespace for tooling-only attributes and elements.
    pub fn work_ns(self) -> &'static Namespace {
        match self {
            Dialect::Eui => &EUI_WORK_NS,
            Dialect::Gui => &GUI_WORK_NS,
        }
    }

    /// Package prefix of the dialect's component classes.
    pub fn ui_prefix(self) -> &'static str {
        match self {
            Dialect::Eui => "eui.",
            Dialect::Gui => "egret.gui.",
        }
    }

    /// Primitive type names that pass through name resolution unqualified.
    pub fn basic_types(self) -> &'static [&'static str] {
        match self {
            Dialect::Eui => &["Array", "boolean", "string", "number"],
            Dialect::Gui => &[
                "void", "any", "number", "string", "boolean", "Object", "Array", "Function",
            ],
        }
    }

    /// Engine core classes reachable from the UI namespace.
    pub fn core_classes(self) -> &'static [&'static str] {
        &["Point", "Matrix", "Rectangle"]
    }

    /// Whether a markup file with the given root class declares a skin.
    pub fn is_skin_root(self, root_class: &str) -> bool {
        match self {
            Dialect::Eui => root_class == "eui.Skin",
            Dialect::Gui => true,
        }
    }
}
