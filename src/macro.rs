/// Macro for generating a closed set of codes: a fieldless enum where every variant carries a
/// stable string code and a human-readable description.
///
/// The generated enum is `Copy + Ord + Hash`, implements `Display` and `FromStr` with its code,
/// and is (de)serialized as the code string. Unknown codes fail to parse instead of silently
/// mapping to something.
///
/// Example usage:
/// ```
/// use portal_authz::define_codes;
///
/// define_codes! {
///     /// Document states
///     pub enum DocumentState {
///         Draft = "DRAFT" => "Being written",
///         Published = "PUBLISHED" => "Visible to everyone",
///     }
/// }
///
/// assert_eq!(DocumentState::Draft.code(), "DRAFT");
/// assert_eq!(DocumentState::from_code("PUBLISHED"), Some(DocumentState::Published));
/// assert!("ARCHIVED".parse::<DocumentState>().is_err());
/// assert_eq!(DocumentState::all().count(), 2);
/// ```
#[macro_export]
macro_rules! define_codes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $code:literal => $description:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn code(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $(Self::$variant => $description,)*
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn all() -> impl Iterator<Item = Self> {
                Self::ALL.iter().copied()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ParseCodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_code(s).ok_or_else(|| $crate::ParseCodeError::new(stringify!($name), s))
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let code =
                    <String as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                code.parse().map_err(<D::Error as $crate::__private::serde::de::Error>::custom)
            }
        }
    };
}
