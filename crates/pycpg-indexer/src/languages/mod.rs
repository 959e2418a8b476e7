//! Language extractors, one per grammar

pub mod python;

use crate::backend::Grammar;
use crate::extractor::LanguageExtractor;

/// Extractor paired with a grammar.
pub fn get_extractor(grammar: Grammar) -> Box<dyn LanguageExtractor> {
    match grammar {
        Grammar::Python => Box::new(python::PythonExtractor),
    }
}
