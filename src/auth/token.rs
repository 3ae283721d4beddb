#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_str_creates_token() {
        let token_str = "abcdefghijklmnopqrstuvwxyz0123456789abcdefghijklmnop";
        let token = Token::from(token_str);

        assert_eq!(token.as_str(), token_str);
    }

    #[test]
    fn test_token_from_owned_string() {
        let token = Token::from(String::from("owned_token"));

        assert_eq!(token.as_str(), "owned_token");
    }

    #[test]
    fn test_token_from_empty_string() {
        let token = Token::from("");

        assert_eq!(token.as_str(), "");
        assert!(token.is_empty());
    }

    #[test]
    fn test_token_debug_redacts_value() {
        let sensitive_token = "pat_very_secret_token_do_not_log";
        let token = Token::from(sensitive_token);

        let debug_output = format!("{token:?}");

        assert_eq!(debug_output, "<redacted>");
        assert!(!debug_output.contains(sensitive_token));
        assert!(!debug_output.contains("secret"));
    }

    #[test]
    fn test_token_debug_in_struct() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct ApiClient {
            token: Token,
            endpoint: String,
        }

        let client = ApiClient {
            token: Token::from("super_secret_token"),
            endpoint: String::from("https://tfs.corp.local"),
        };

        let debug_output = format!("{client:?}");

        assert!(debug_output.contains("<redacted>"));
        assert!(!debug_output.contains("super_secret_token"));
        assert!(debug_output.contains("https://tfs.corp.local"));
    }

    #[test]
    fn test_cloned_token_keeps_value() {
        let token = Token::from("clone_me");
        let cloned = token.clone();

        assert_eq!(token, cloned);
        assert_eq!(cloned.as_str(), "clone_me");
    }
}
