//! Configuration for the updater.

use crate::platform::Platform;

/// Manifest location used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://vpn.ht/update.json";

/// Environment variable consulted by [`Environment::from_env`].
pub const ENVIRONMENT_VAR: &str = "UPDATER_ENV";

/// DSA (1024-bit, SHA-1) key the release process signs artifacts with.
pub const DEFAULT_PUBLIC_KEY: &str = "-----BEGIN PUBLIC KEY-----
MIIBtjCCASsGByqGSM44BAEwggEeAoGBAPNM5SX+yR8MJNrX9uCQIiy0t3IsyNHs
HWA180wDDd3S+DzQgIzDXBqlYVmcovclX+1wafshVDw3xFTJGuKuva7JS3yKnjds
NXbvM9CrJ2Jngfd0yQPmSh41qmJXHHSwZfPZBxQnspKjbcC5qypM5DqX9oDSJm2l
fM/weiUGnIf7AhUAgokTdF7G0USfpkUUOaBOmzx2RRkCgYAyy5WJDESLoU8vHbQc
rAMnPZrImUwjFD6Pa3CxhkZrulsAOUb/gmc7B0K9I6p+UlJoAvVPXOBMVG/MYeBJ
19/BH5UNeI1sGT5/Kg2k2rHVpuqzcvlS/qctIENgCNMo49l3LrkHbJPXKJ6bf+T2
8lFWRP2kVlrx/cHdqSi6aHoGTAOBhAACgYBTNeXBHbWDOxzSJcD6q4UDGTnHaHHP
JgeCrPkH6GBa9azUsZ+3MA98b46yhWO2QuRwmFQwPiME+Brim3tHlSuXbL1e5qKf
GOm3OxA3zKXG4cjy6TyEKajYlT45Q+tgt1L1HuGAJjWFRSA0PP9ctC6nH+2N3HmW
RTcms0CPio56gg==
-----END PUBLIC KEY-----
";

/// Runtime environment. Only production performs network checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Checks hit the manifest endpoint.
    #[default]
    Production,
    /// Checks always report no update and make no network calls.
    Development,
}

impl Environment {
    /// Read the environment from [`ENVIRONMENT_VAR`]. Anything other than
    /// `development` is treated as production.
    pub fn from_env() -> Self {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => Self::from_name(&value),
            Err(_) => Self::Production,
        }
    }

    fn from_name(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Whether update checks are allowed to reach the network.
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Settings for an [`Updater`](crate::Updater).
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// URL of the update manifest
    pub endpoint: String,
    /// PEM-encoded (SPKI) DSA public key used to verify artifact signatures
    pub public_key_pem: String,
    /// Version of the running application
    pub current_version: String,
    /// Production or development mode
    pub environment: Environment,
    /// Manifest key to select the update descriptor by
    pub platform: Platform,
}

impl UpdaterConfig {
    /// Create a config for the given running version, with every other field
    /// at its default.
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            public_key_pem: DEFAULT_PUBLIC_KEY.to_string(),
            current_version: current_version.into(),
            environment: Environment::from_env(),
            platform: Platform::current(),
        }
    }

    /// Set the manifest endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the verification key
    pub fn public_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.public_key_pem = pem.into();
        self
    }

    /// Set the environment
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the platform key
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}
