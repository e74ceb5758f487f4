use std::fmt;
use std::fmt::Formatter;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Weather report as extracted by the model
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Weather {
    /// The city to get the weather for
    pub city: String,
    /// The temperature in celsius
    pub temperature: f64,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "city='{}' temperature={:?}", self.city, self.temperature)
    }
}
