use super::{AppError, ConfigError, HttpError, StoreError, ValidationError};

impl From<&'static str> for ValidationError {
    fn from(message: &'static str) -> Self {
        ValidationError::TestExpectation { message }
    }
}

impl From<String> for ValidationError {
    fn from(value: String) -> Self {
        ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for HttpError {
    fn from(message: &'static str) -> Self {
        HttpError::TestExpectation { message }
    }
}

impl From<String> for HttpError {
    fn from(value: String) -> Self {
        HttpError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for StoreError {
    fn from(message: &'static str) -> Self {
        StoreError::TestExpectation { message }
    }
}

impl From<String> for StoreError {
    fn from(value: String) -> Self {
        StoreError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_flagged() -> Result<(), String> {
        let store = AppError::store("store down");
        if store.is_transport() {
            return Err("store error reported as transport".to_owned());
        }
        let http = AppError::http("not transport either");
        if http.is_transport() {
            return Err("test expectation reported as transport".to_owned());
        }
        Ok(())
    }
}
