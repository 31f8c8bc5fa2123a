use crate::error::Error;
use crate::request::TimeZone;
use clap::Args as ClapArgs;
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "https://api.searchads.apple.com/api/v2";
const OUTPUT_DIR: &str = "./";
const PAGE_LIMIT: &str = "1000";
const MAX_PAGE_LIMIT: u32 = 1000;

#[derive(ClapArgs, Debug)]
pub struct Config {
    #[arg(long, default_value = DEFAULT_API_URL, env = "API_URL")]
    pub(crate) api_url: String,

    /// Organization id shown in the top right menu of the Search Ads account
    #[arg(long, env = "ORG_ID")]
    pub(crate) org_id: String,

    #[arg(long, env = "SEARCH_ADS_CERT")]
    pub(crate) cert_path: PathBuf,

    #[arg(long, env = "SEARCH_ADS_KEY")]
    pub(crate) key_path: PathBuf,

    #[arg(long, value_enum, default_value_t = TimeZone::Utc, env = "TIME_ZONE")]
    pub(crate) time_zone: TimeZone,

    #[arg(long, default_value = PAGE_LIMIT, env = "PAGE_LIMIT")]
    pub(crate) page_limit: u32,

    #[arg(long, default_value = OUTPUT_DIR, env = "OUTPUT_DIR")]
    pub(crate) output_dir: PathBuf,
}

impl Config {
    /// Checks the settings that clap cannot check on its own.
    ///
    /// Runs once before any request is made so that a bad certificate path
    /// fails the run before the first network call.
    pub fn validate(&self) -> Result<(), Error> {
        if self.org_id.is_empty() || !self.org_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidConfig {
                message: format!("org id '{}' must be a non-empty number", self.org_id),
            });
        }

        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(Error::InvalidConfig {
                message: format!(
                    "page limit {} must be between 1 and {}",
                    self.page_limit, MAX_PAGE_LIMIT
                ),
            });
        }

        for path in [&self.cert_path, &self.key_path] {
            if !path.is_file() {
                return Err(Error::InvalidConfig {
                    message: format!("certificate file {} does not exist", path.display()),
                });
            }
        }

        if !self.output_dir.is_dir() {
            return Err(Error::InvalidConfig {
                message: format!("output directory {} does not exist", self.output_dir.display()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    Config {
        api_url: DEFAULT_API_URL.to_string(),
        org_id: "123456".to_string(),
        cert_path: dir.join("cert.pem"),
        key_path: dir.join("cert.key"),
        time_zone: TimeZone::Utc,
        page_limit: 1000,
        output_dir: dir.to_path_buf(),
    }
}
