//! Prompt builders

use super::Schema;

/// Sentiment analysis over a symbol's recent headlines
pub fn summary_prompt(symbol: &str, headlines: &[&str]) -> String {
    format!(
        "Based on the following recent news headlines for {}, provide a brief, one-paragraph \
         analysis of the overall market sentiment. Is it positive, negative, or neutral? \
         Mention key themes.\n\nHeadlines:\n{}",
        symbol,
        headlines.join("\n")
    )
}

/// Stock picks derived from general market headlines
pub fn recommendation_prompt(headlines: &[&str]) -> String {
    format!(
        "Act as a financial analyst. Based on these recent market news headlines, identify 3 \
         promising stocks. For each stock, provide the ticker symbol, company name, and a concise \
         one-sentence reason for the recommendation. Do not include any stocks that are not \
         publicly traded.\n\nHeadlines:\n{}",
        headlines.join("\n")
    )
}

/// Array of `{symbol, companyName, reason}`, all required
pub fn recommendation_schema() -> Schema {
    Schema::array_of(Schema::object_requiring(vec![
        ("symbol", Schema::string()),
        ("companyName", Schema::string()),
        ("reason", Schema::string()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::SchemaType;

    #[test]
    fn test_summary_prompt_embeds_symbol_and_headlines() {
        let prompt = summary_prompt("AAPL", &["Apple beats estimates", "iPhone sales slow"]);

        assert!(prompt.contains("headlines for AAPL,"));
        assert!(prompt.ends_with("Headlines:\nApple beats estimates\niPhone sales slow"));
    }

    #[test]
    fn test_recommendation_schema() {
        let schema = recommendation_schema();
        assert_eq!(schema.kind, SchemaType::Array);

        let item = schema.items.unwrap();
        assert_eq!(item.kind, SchemaType::Object);
        assert_eq!(
            item.required.unwrap(),
            vec!["symbol".to_string(), "companyName".to_string(), "reason".to_string()]
        );
        assert_eq!(item.properties.unwrap().len(), 3);
    }
}
