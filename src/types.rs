/// Keyword phrase exactly as supplied by the caller.
/// Example: `Freeze Dried Strawberries`
pub type Phrase = String;
/// Lowercased, trimmed, whitespace-collapsed phrase used as a lookup key.
/// Example: `freeze dried strawberries`
pub type NormalizedPhrase = String;
/// Bigram or unigram that names a root cluster.
/// Examples: `freeze dried`, `strawberry`
pub type RootPhrase = String;
/// Canonical stem shared by every member of a variant group.
/// Example: `freeze dried strawberry`
pub type VariantKey = String;
/// Competitor listing title returned by a scraper.
/// Example: `Organic Freeze Dried Strawberries, 1.2 oz Bag`
pub type CompetitorTitle = String;
/// Free-text justification attached to a category or verdict.
/// Examples: `no competitor titles found`, `Verified as relevant: 6 of 8 titles match`
pub type Reasoning = String;
/// Single meaningful word pulled out of a keyword.
/// Example: `crunchy`
pub type Modifier = String;
/// Progress or warning message text.
/// Example: `Verifying keywords: 3/10`
pub type LogMessage = String;
