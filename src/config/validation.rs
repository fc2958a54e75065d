use crate::config::types::{
    Config, CrawlerConfig, ImageConfig, OutputConfig, PacingConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_pacing_config(&config.pacing)?;
    validate_image_config(&config.images)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "page_budget must be >= 1, got {}",
            config.page_budget
        )));
    }

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start_page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.checkpoint_every_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_every_pages must be >= 1, got {}",
            config.checkpoint_every_pages
        )));
    }

    if config.publish_every_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "publish_every_pages must be >= 1, got {}",
            config.publish_every_pages
        )));
    }

    Ok(())
}

/// Validates pacing configuration
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.page_jitter_ms > config.page_delay_ms {
        return Err(ConfigError::Validation(format!(
            "page_jitter_ms ({}) must not exceed page_delay_ms ({})",
            config.page_jitter_ms, config.page_delay_ms
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates image download configuration
fn validate_image_config(config: &ImageConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "images.directory cannot be empty".to_string(),
        ));
    }

    if config.max_concurrent < 1 || config.max_concurrent > 32 {
        return Err(ConfigError::Validation(format!(
            "images.max_concurrent must be between 1 and 32, got {}",
            config.max_concurrent
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "images.timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates the target-site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !config.page_url_template.contains("{page}") {
        return Err(ConfigError::Validation(
            "site.page_url_template must contain a {page} placeholder".to_string(),
        ));
    }

    // The template must resolve to a parseable URL for any page number
    let sample = config.page_url_template.replace("{page}", "1");
    Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid page_url_template: {}", e)))?;

    if config.item_selector.is_empty() {
        return Err(ConfigError::Validation(
            "site.item_selector cannot be empty".to_string(),
        ));
    }

    if config.id_attribute.is_empty() {
        return Err(ConfigError::Validation(
            "site.id_attribute cannot be empty".to_string(),
        ));
    }

    if config.name_selector.is_empty() {
        return Err(ConfigError::Validation(
            "site.name_selector cannot be empty".to_string(),
        ));
    }

    for template in &config.image_candidate_templates {
        if !template.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "image candidate template '{}' must contain an {{id}} placeholder",
                template
            )));
        }
        let sample = template.replace("{id}", "sample");
        Url::parse(&sample).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid image candidate template '{}': {}", template, e))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dataset_path.is_empty() {
        return Err(ConfigError::Validation(
            "output.dataset_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "output.checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.events_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "output.events_capacity must be >= 1, got {}",
            config.events_capacity
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
