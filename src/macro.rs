/// Macro for generating a closed module enumeration with per-module exemption flag.
///
/// Each variant maps to the display name the permission authority uses for it. Variants marked
/// `(exempt)` are skipped by cascade rules and "select all".
///
/// Example usage:
/// ```
/// use rolegate::{define_modules, ModuleKey, PermissionModule};
///
/// define_modules! {
///     /// Modules of the HR console
///     pub modules Console {
///         /// Company policy documents
///         Policies => "Policies",
///         Employee => "Employee",
///         SupportingTickets => "Supporting Tickets" (exempt),
///     }
/// }
///
/// assert_eq!(Console::SupportingTickets.key(), ModuleKey::new("supporting tickets"));
/// assert!(Console::SupportingTickets.is_exempt());
/// assert!(!Console::Policies.is_exempt());
/// assert_eq!(Console::from_name("  EMPLOYEE"), Some(Console::Employee));
/// assert_eq!(Console::all_modules().len(), 3);
/// ```
#[macro_export]
macro_rules! define_modules {
    (@exempt exempt) => { true };
    (@exempt) => { false };
    (
        $(#[$meta:meta])*
        $vis:vis modules $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $display:literal $( ($flag:ident) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        #[allow(unused)]
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn display_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)*
                }
            }

            pub fn is_exempt(&self) -> bool {
                match self {
                    $(Self::$variant => $crate::define_modules!(@exempt $($flag)?),)*
                }
            }

            pub fn key(&self) -> $crate::ModuleKey {
                $crate::ModuleKey::new(self.display_name())
            }

            /// Looks a module up by name, ignoring case and surrounding whitespace
            pub fn from_name(name: &str) -> Option<Self> {
                let key = $crate::ModuleKey::new(name);
                Self::ALL.iter().copied().find(|module| module.key() == key)
            }

            // Helper function to register every module of this enumeration
            pub fn register_all(registry: &mut $crate::ModuleRegistryBuilder) {
                registry.register::<$name>();
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str(self.display_name())
            }
        }

        impl $crate::PermissionModule for $name {
            fn display_name(&self) -> &'static str {
                $name::display_name(self)
            }

            fn is_exempt(&self) -> bool {
                $name::is_exempt(self)
            }

            fn all_modules() -> Vec<Self> {
                Self::ALL.to_vec()
            }
        }

        impl ::std::convert::From<$name> for $crate::ModuleKey {
            fn from(module: $name) -> Self {
                module.key()
            }
        }
    };
}
