//! Dependency scopes and the rules for propagating them transitively.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    Import,
}

impl std::str::FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "provided" => Self::Provided,
            "runtime" => Self::Runtime,
            "test" => Self::Test,
            "system" => Self::System,
            "import" => Self::Import,
            _ => Self::Compile,
        })
    }
}

impl Scope {
    pub const ALL: [Self; 6] = [
        Self::Compile,
        Self::Provided,
        Self::Runtime,
        Self::Test,
        Self::System,
        Self::Import,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Provided => "provided",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::System => "system",
            Self::Import => "import",
        }
    }

    /// Scope a transitive edge declared as `declared` takes when its owner
    /// was reached under `self`. `None` drops the edge.
    ///
    /// `System` and `Import` never act as incoming scopes: system artifacts
    /// are leaves and imports only shape POM assembly.
    pub const fn effective(self, declared: Self) -> Option<Self> {
        match (self, declared) {
            (_, Self::Provided | Self::Test | Self::Import) => None,
            (Self::Compile, Self::Compile) => Some(Self::Compile),
            (Self::Compile, Self::Runtime) => Some(Self::Runtime),
            (Self::Compile | Self::Provided, Self::System) => Some(Self::System),
            (Self::Provided, Self::Compile | Self::Runtime) => Some(Self::Provided),
            (Self::Runtime, Self::Compile | Self::Runtime) => Some(Self::Runtime),
            (Self::Test, Self::Compile | Self::Runtime) => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classpath a caller asks the resolver to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeBucket {
    CompileTime,
    Runtime,
    TestCompileTime,
    TestRuntime,
}

impl ScopeBucket {
    pub const ALL: [Self; 4] = [
        Self::CompileTime,
        Self::Runtime,
        Self::TestCompileTime,
        Self::TestRuntime,
    ];

    pub const fn includes(self, scope: Scope) -> bool {
        match self {
            Self::CompileTime => matches!(scope, Scope::Compile | Scope::Provided | Scope::System),
            Self::Runtime => matches!(scope, Scope::Compile | Scope::Runtime | Scope::System),
            Self::TestCompileTime => matches!(
                scope,
                Scope::Compile | Scope::Provided | Scope::System | Scope::Test
            ),
            Self::TestRuntime => matches!(
                scope,
                Scope::Compile | Scope::Runtime | Scope::System | Scope::Test
            ),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompileTime => "compile-time",
            Self::Runtime => "runtime",
            Self::TestCompileTime => "test-compile-time",
            Self::TestRuntime => "test-runtime",
        }
    }
}

impl fmt::Display for ScopeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str() {
        assert_eq!("test".parse::<Scope>().unwrap(), Scope::Test);
        assert_eq!("PROVIDED".parse::<Scope>().unwrap(), Scope::Provided);
        assert_eq!("import".parse::<Scope>().unwrap(), Scope::Import);
        assert_eq!("".parse::<Scope>().unwrap(), Scope::Compile);
        assert_eq!("bogus".parse::<Scope>().unwrap(), Scope::Compile);
    }

    #[test]
    fn test_effective_scope_table() {
        use Scope::*;
        let expected = [
            (Compile, [Some(Compile), None, Some(Runtime), None, Some(System), None]),
            (Provided, [Some(Provided), None, Some(Provided), None, Some(System), None]),
            (Runtime, [Some(Runtime), None, Some(Runtime), None, None, None]),
            (Test, [Some(Test), None, Some(Test), None, None, None]),
        ];
        for (incoming, row) in expected {
            for (declared, result) in Scope::ALL.into_iter().zip(row) {
                assert_eq!(
                    incoming.effective(declared),
                    result,
                    "{incoming} x {declared}"
                );
            }
        }
    }

    #[test]
    fn test_effective_scope_stable_along_compile_edges() {
        for incoming in [Scope::Compile, Scope::Provided, Scope::Runtime, Scope::Test] {
            for declared in Scope::ALL {
                let Some(reached) = incoming.effective(declared) else {
                    continue;
                };
                if reached == Scope::System {
                    continue;
                }
                assert_eq!(reached.effective(Scope::Compile), Some(reached));
                assert_eq!(incoming.effective(declared), Some(reached));
            }
        }
    }

    #[test]
    fn test_bucket_includes() {
        assert!(ScopeBucket::CompileTime.includes(Scope::Provided));
        assert!(!ScopeBucket::CompileTime.includes(Scope::Runtime));
        assert!(ScopeBucket::Runtime.includes(Scope::Runtime));
        assert!(!ScopeBucket::Runtime.includes(Scope::Provided));
        assert!(ScopeBucket::TestRuntime.includes(Scope::Test));
        assert!(!ScopeBucket::TestRuntime.includes(Scope::Provided));
        for bucket in ScopeBucket::ALL {
            assert!(!bucket.includes(Scope::Import));
            assert!(bucket.includes(Scope::System));
        }
    }
}
