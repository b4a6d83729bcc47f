pub(crate) const NOT_FOUND_BODY: &str = "Not Found";
pub(crate) const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";
pub(crate) const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error";

pub(crate) const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub(crate) const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub(crate) const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
