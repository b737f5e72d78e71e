/// Field names of the flat record mapping shared with fetchers and exporters
pub const FIELD_ID: &str = "job_id";
pub const FIELD_TITLE: &str = "job_title";
pub const FIELD_COMPANY: &str = "company_name";
pub const FIELD_LOCATION: &str = "location";
pub const FIELD_SUMMARY: &str = "job_summary";
pub const FIELD_URL: &str = "job_url";
pub const FIELD_DATE_POSTED: &str = "date_posted";
pub const FIELD_DATE_SCRAPED: &str = "date_scraped";
pub const FIELD_CATEGORY: &str = "role_category";
pub const FIELD_COMPANY_SIZE: &str = "company_size";
pub const FIELD_REVENUE_RANGE: &str = "company_revenue_range";
pub const FIELD_FUNDING_STAGE: &str = "funding_stage";

/// Fields a record must carry to survive validation
pub const REQUIRED_FIELDS: [&str; 5] = [
    FIELD_TITLE,
    FIELD_COMPANY,
    FIELD_LOCATION,
    FIELD_URL,
    FIELD_DATE_SCRAPED,
];

/// Enrichment fields that contribute to the quality score
pub const OPTIONAL_FIELDS: [&str; 5] = [
    FIELD_SUMMARY,
    FIELD_DATE_POSTED,
    FIELD_REVENUE_RANGE,
    FIELD_COMPANY_SIZE,
    FIELD_FUNDING_STAGE,
];

/// Category label used when a record carries no category tag
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Legal suffixes stripped from company names, in priority order (first match wins)
pub const COMPANY_SUFFIXES: [&str; 12] = [
    ", Inc.",
    " Inc.",
    ", LLC",
    " LLC",
    ", Ltd.",
    " Ltd.",
    ", Corp.",
    " Corp.",
    ", Corporation",
    " Corporation",
    ", Co.",
    " Co.",
];

/// Country names stripped from the end of a location
pub const COUNTRY_SUFFIXES: [&str; 2] = ["United States", "USA"];

pub const US_STATE_CODES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA",
    "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MD",
    "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC",
    "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY",
];

pub const US_MAJOR_CITIES: [&str; 20] = [
    "NEW YORK", "LOS ANGELES", "CHICAGO", "HOUSTON", "PHOENIX",
    "PHILADELPHIA", "SAN ANTONIO", "SAN DIEGO", "DALLAS", "SAN JOSE",
    "AUSTIN", "SEATTLE", "DENVER", "BOSTON", "SAN FRANCISCO",
    "PORTLAND", "ATLANTA", "MIAMI", "DETROIT", "WASHINGTON",
];

/// Built-in browser signatures used when no identity pool is configured
pub const DEFAULT_USER_AGENTS: [&str; 13] = [
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/119.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/119.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Token bucket polling interval while waiting for a refill
pub const RATE_LIMIT_POLL_INTERVAL_MS: u64 = 100;

/// Seconds per token-bucket period (capacity is expressed per hour)
pub const SECONDS_PER_HOUR: f64 = 3600.0;
