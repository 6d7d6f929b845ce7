use crate::error::CodegenError;
use proc_macro2::TokenStream;
use quote::quote;
use syn::Path;

/// Environment variable overriding the runtime crate path.
pub const RUNTIME_CRATE_ENV: &str = "CFGBLOB_RUNTIME_CRATE";

fn env_path(name: &str) -> Option<TokenStream> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .and_then(|value| syn::parse_str::<Path>(&value).ok())
        .map(|path| quote!(#path))
}

///
/// CratePaths
///
/// Resolves the runtime crate root that generated code calls into.
/// Precedence: `CFGBLOB_RUNTIME_CRATE`, then the configured path, then
/// `::cfgblob_runtime`.
///

#[derive(Clone, Debug)]
pub struct CratePaths {
    pub runtime: TokenStream,
}

impl CratePaths {
    #[must_use]
    pub fn new() -> Self {
        Self {
            runtime: env_path(RUNTIME_CRATE_ENV).unwrap_or_else(|| quote!(::cfgblob_runtime)),
        }
    }

    /// Resolve with a configured runtime path; the environment still wins.
    pub fn with_runtime(configured: Option<&str>) -> Result<Self, CodegenError> {
        if let Some(runtime) = env_path(RUNTIME_CRATE_ENV) {
            return Ok(Self { runtime });
        }

        match configured {
            Some(value) => {
                let path = syn::parse_str::<Path>(value.trim())
                    .map_err(|_| CodegenError::RuntimePath(value.to_string()))?;

                Ok(Self {
                    runtime: quote!(#path),
                })
            }
            None => Ok(Self::new()),
        }
    }
}

impl Default for CratePaths {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///
