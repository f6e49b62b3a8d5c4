// prompts.rs

pub fn bias_detection_prompt(article_text: &str) -> String {
    format!(
        "Analyze the following news article for political bias. Consider:
1. Language tone and emotional words
2. Source selection and quotes
3. Framing of issues
4. Missing perspectives
5. Headlines vs content alignment

Article: {}

Provide a JSON response with:
{{
  \"bias_score\": -1.0 to 1.0 (-1 = far left, 0 = center, 1 = far right),
  \"confidence\": 0.0 to 1.0,
  \"reasoning\": \"brief explanation\",
  \"indicators\": [\"list\", \"of\", \"bias\", \"indicators\", \"found\"]
}}",
        article_text
    )
}

pub fn fact_extraction_prompt(article_text: &str) -> String {
    format!(
        "Extract key factual claims from this news article. Focus on:
1. Statistical claims with numbers
2. Quoted statements from officials
3. Event descriptions (who, what, when, where)
4. Cause-effect claims
5. Policy or legal facts

Article: {}

Provide a JSON response with:
{{
  \"facts\": [
    {{
      \"claim\": \"the factual claim\",
      \"type\": \"statistic|quote|event|cause-effect|policy\",
      \"confidence\": 0.0 to 1.0,
      \"source\": \"who made this claim if mentioned\"
    }}
  ],
  \"entities\": {{
    \"people\": [\"list of people mentioned\"],
    \"organizations\": [\"list of organizations\"],
    \"locations\": [\"list of locations\"],
    \"dates\": [\"list of dates/times mentioned\"]
  }}
}}",
        article_text
    )
}
