//! Per-category extractors resolved once per document.

use std::sync::Arc;

use super::InsightError;
use crate::models::{
    InsightCategory, KeyPhrase, MedicalEntity, NamedEntity, PhiSpan, SentimentScore, SyntaxToken,
};
use crate::services::{LanguageService, MedicalService, ServiceResult, TranslationService};

/// Which insight families to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightOptions {
    /// Sentiment, syntax, entities and key phrases.
    pub general: bool,
    /// Medical entities and protected health information.
    pub medical: bool,
    /// Target language code for translation.
    pub translate_to: Option<String>,
    /// Language code of the source text.
    pub language: String,
}

impl Default for InsightOptions {
    fn default() -> Self {
        Self {
            general: false,
            medical: false,
            translate_to: None,
            language: "en".to_string(),
        }
    }
}

impl InsightOptions {
    pub fn is_empty(&self) -> bool {
        !self.general && !self.medical && self.translate_to.is_none()
    }
}

/// Collaborators available to the extractors.
#[derive(Clone, Default)]
pub struct InsightServices {
    pub language: Option<Arc<dyn LanguageService>>,
    pub medical: Option<Arc<dyn MedicalService>>,
    pub translation: Option<Arc<dyn TranslationService>>,
}

/// Result of one extractor call on one segment, offsets still segment-local.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Sentiment(SentimentScore),
    Syntax(Vec<SyntaxToken>),
    Entities(Vec<NamedEntity>),
    KeyPhrases(Vec<KeyPhrase>),
    MedicalEntities(Vec<MedicalEntity>),
    Phi(Vec<PhiSpan>),
    Translation(String),
}

/// One insight category bound to the collaborator that produces it.
#[derive(Clone)]
pub enum Extractor {
    Sentiment(Arc<dyn LanguageService>, String),
    Syntax(Arc<dyn LanguageService>, String),
    Entities(Arc<dyn LanguageService>, String),
    KeyPhrases(Arc<dyn LanguageService>, String),
    MedicalEntities(Arc<dyn MedicalService>),
    Phi(Arc<dyn MedicalService>),
    Translation {
        service: Arc<dyn TranslationService>,
        source: String,
        target: String,
    },
}

impl Extractor {
    pub fn category(&self) -> InsightCategory {
        match self {
            Extractor::Sentiment(..) => InsightCategory::Sentiment,
            Extractor::Syntax(..) => InsightCategory::Syntax,
            Extractor::Entities(..) => InsightCategory::Entities,
            Extractor::KeyPhrases(..) => InsightCategory::KeyPhrases,
            Extractor::MedicalEntities(_) => InsightCategory::MedicalEntities,
            Extractor::Phi(_) => InsightCategory::Phi,
            Extractor::Translation { .. } => InsightCategory::Translation,
        }
    }

    pub async fn extract(&self, text: &str) -> ServiceResult<Extraction> {
        Ok(match self {
            Extractor::Sentiment(svc, lang) => {
                Extraction::Sentiment(svc.sentiment(text, lang).await?)
            }
            Extractor::Syntax(svc, lang) => Extraction::Syntax(svc.syntax(text, lang).await?),
            Extractor::Entities(svc, lang) => {
                Extraction::Entities(svc.entities(text, lang).await?)
            }
            Extractor::KeyPhrases(svc, lang) => {
                Extraction::KeyPhrases(svc.key_phrases(text, lang).await?)
            }
            Extractor::MedicalEntities(svc) => {
                Extraction::MedicalEntities(svc.medical_entities(text).await?)
            }
            Extractor::Phi(svc) => Extraction::Phi(svc.phi(text).await?),
            Extractor::Translation {
                service,
                source,
                target,
            } => Extraction::Translation(service.translate(text, source, target).await?),
        })
    }

    /// Resolve options into the fixed, ordered extractor list:
    /// general categories, then medical, then translation.
    pub fn resolve(
        options: &InsightOptions,
        services: &InsightServices,
    ) -> Result<Vec<Extractor>, InsightError> {
        let mut extractors = Vec::new();

        if options.general {
            let svc = services
                .language
                .clone()
                .ok_or(InsightError::MissingCollaborator("language"))?;
            let lang = options.language.clone();
            extractors.push(Extractor::Sentiment(svc.clone(), lang.clone()));
            extractors.push(Extractor::Syntax(svc.clone(), lang.clone()));
            extractors.push(Extractor::Entities(svc.clone(), lang.clone()));
            extractors.push(Extractor::KeyPhrases(svc, lang));
        }

        if options.medical {
            let svc = services
                .medical
                .clone()
                .ok_or(InsightError::MissingCollaborator("medical"))?;
            extractors.push(Extractor::MedicalEntities(svc.clone()));
            extractors.push(Extractor::Phi(svc));
        }

        if let Some(target) = &options.translate_to {
            let service = services
                .translation
                .clone()
                .ok_or(InsightError::MissingCollaborator("translation"))?;
            extractors.push(Extractor::Translation {
                service,
                source: options.language.clone(),
                target: target.clone(),
            });
        }

        Ok(extractors)
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Extractor({})", self.category())
    }
}
