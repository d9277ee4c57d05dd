/// Environment variable carrying the solution identifier, used as the HTTP user agent
pub const SOLUTION_IDENTIFIER: &str = "SOLUTION_IDENTIFIER";
/// Environment variable overriding the metrics collection endpoint
pub const METRICS_ENDPOINT: &str = "METRICS_ENDPOINT";

/// User agent used when SOLUTION_IDENTIFIER is unset
pub const DEFAULT_SOLUTION_IDENTIFIER: &str = "AwsSolution/SO0133";
/// Solutions metrics collection endpoint used when METRICS_ENDPOINT is unset
pub const DEFAULT_METRICS_ENDPOINT: &str = "https://metrics.awssolutionsbuilder.com/generic";
