use custom_error::custom_error;

custom_error! { pub Error
    InvalidConfig{message: String} = "invalid configuration: {message}",
    DuplicateId{id: String} = "sequence id {id} appears more than once",
    UnknownId{id: String} = "no background probabilities for sequence {id}",
    MissingProbability{id: String, word: String} = "no background probability for word {word} of sequence {id}",
    UndefinedDissimilarity{first: String, second: String} = "dissimilarity between {first} and {second} is undefined",
    NoSharedWords{first: String, second: String, k: usize} = "{first} and {second} share no words at k={k}, try a smaller k",
    InvalidScore{first: String, second: String, score: f64} = "score {score} between {first} and {second} is not a non-negative number",
    SimilarityOutput{statistic: String} = "{statistic} scores similarities, not distances; pass --allow-similarity to write them anyway",
    ZeroNormalisation{first: String, second: String, word: String} = "normalised counts of {word} are both zero for {first} and {second}",
    ThreadPool{source: rayon::ThreadPoolBuildError} = "could not build worker pool: {source}",
    Io{source: std::io::Error} = "io error: {source}",
    Json{source: serde_json::Error} = "json error: {source}",
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }
}
