//! Outreach messages for selected farmers.

use std::sync::Arc;
use std::time::Duration;

use harvest_core::{Farmer, HarvestError, NegotiatorConfig, Request, RequestItem, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::service::{GenerateOptions, TextService};

/// Default per-call timeout for message generation.
pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(12);

const DEFAULT_PERSONALITY: &str = "cordial, objetivo e respeitoso com o produtor";

/// Facts the message is built from.
#[derive(Debug, Clone, Copy)]
pub struct OfferContext<'a> {
    pub farmer: &'a Farmer,
    pub request: &'a Request,
    pub market_value: f64,
    pub proposed_value: f64,
    pub negotiator: Option<&'a NegotiatorConfig>,
}

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Service,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMessage {
    pub text: String,
    pub source: MessageSource,
}

/// Writes one outreach message per farmer. Never fails.
#[derive(Clone)]
pub struct MessageGenerator {
    service: Arc<dyn TextService>,
    timeout: Duration,
}

impl MessageGenerator {
    pub fn new(service: Arc<dyn TextService>) -> Self {
        Self {
            service,
            timeout: DEFAULT_MESSAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate a message, falling back to [`fallback_message`] when the
    /// service fails, times out or returns blank text.
    pub async fn generate(&self, ctx: &OfferContext<'_>) -> GeneratedMessage {
        match self.call(ctx).await {
            Ok(text) => {
                debug!(farmer_id = %ctx.farmer.id, "outreach message generated");
                GeneratedMessage {
                    text,
                    source: MessageSource::Service,
                }
            }
            Err(e) => {
                warn!(
                    farmer_id = %ctx.farmer.id,
                    request_id = %ctx.request.id,
                    error = %e,
                    "message generation failed, using template"
                );
                GeneratedMessage {
                    text: fallback_message(ctx),
                    source: MessageSource::Fallback,
                }
            }
        }
    }

    async fn call(&self, ctx: &OfferContext<'_>) -> Result<String> {
        let system = style_instruction(ctx.negotiator);
        let user = task_instruction(ctx);

        let text = tokio::time::timeout(
            self.timeout,
            self.service.generate(&system, &user, &GenerateOptions::prose()),
        )
        .await
        .map_err(|_| HarvestError::Timeout {
            duration_ms: self.timeout.as_millis() as u64,
            message: "message generation".to_string(),
        })??;

        let text = text.trim();
        if text.is_empty() {
            return Err(HarvestError::ExternalService("empty message".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Persona and style block.
pub fn style_instruction(negotiator: Option<&NegotiatorConfig>) -> String {
    let personality = negotiator
        .map(|n| n.personality.trim())
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PERSONALITY);

    let mut text = format!(
        "Você é um agente de negociação de uma rede de compras públicas de alimentos da agricultura familiar. \
         Personalidade: {}. Escreva em português do Brasil, em no máximo 120 palavras, \
         sem markdown e sem inventar valores ou datas.",
        personality
    );

    if let Some(negotiator) = negotiator {
        if !negotiator.objectives.is_empty() {
            text.push_str("\nObjetivos:");
            for objective in &negotiator.objectives {
                text.push_str(&format!("\n- {}", objective));
            }
        }
        let instructions = negotiator.instructions.trim();
        if !instructions.is_empty() {
            text.push_str(&format!("\nInstruções adicionais: {}", instructions));
        }
    }

    text
}

/// Task block embedding the concrete request facts.
pub fn task_instruction(ctx: &OfferContext<'_>) -> String {
    let capacity = ctx.farmer.weekly_capacity.trim();
    format!(
        "Escreva uma mensagem para o produtor {name} convidando-o a atender a demanda abaixo.\n\
         Programa: {program}\n\
         Itens: {items}\n\
         Prazo de entrega: {deadline}\n\
         Urgência (1 a 5): {urgency}\n\
         Valor de mercado estimado: {market}\n\
         Valor proposto: {proposed}\n\
         Capacidade semanal informada: {capacity}\n\
         Termine perguntando se ele tem capacidade para atender a quantidade no prazo.",
        name = ctx.farmer.name,
        program = ctx.request.program.label(),
        items = describe_items(&ctx.request.items),
        deadline = format_date(ctx.request),
        urgency = ctx.request.urgency,
        market = format_brl(ctx.market_value),
        proposed = format_brl(ctx.proposed_value),
        capacity = if capacity.is_empty() { "não informada" } else { capacity },
    )
}

/// Deterministic message built from the same facts as the service prompt.
pub fn fallback_message(ctx: &OfferContext<'_>) -> String {
    format!(
        "Olá, {name}! Temos uma nova demanda do programa {program}: {items}. \
         Prazo de entrega: {deadline}. Valor de mercado estimado: {market}. \
         Valor proposto: {proposed}. Você tem capacidade para atender essa quantidade até o prazo?",
        name = ctx.farmer.name,
        program = ctx.request.program.label(),
        items = describe_items(&ctx.request.items),
        deadline = format_date(ctx.request),
        market = format_brl(ctx.market_value),
        proposed = format_brl(ctx.proposed_value),
    )
}

fn describe_items(items: &[RequestItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{} {} de {}",
                format_quantity(item.quantity),
                item.unit,
                item.product_name
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{:.0}", quantity)
    } else {
        format!("{:.1}", quantity).replace('.', ",")
    }
}

fn format_date(request: &Request) -> String {
    request.need_by.format("%d/%m/%Y").to_string()
}

/// `R$ 1234,50` style amount.
pub fn format_brl(value: f64) -> String {
    format!("R$ {:.2}", value).replace('.', ",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedReply, ScriptedTextService};
    use chrono::NaiveDate;
    use harvest_core::Program;
    use uuid::Uuid;

    fn fixtures() -> (Farmer, Request) {
        let request = Request::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Program::SchoolFeeding,
            NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            vec![
                RequestItem::new("Alface", 50.0, "kg"),
                RequestItem::new("Tomate", 30.0, "kg"),
            ],
        );
        let farmer = Farmer::new(request.municipality_id, "Dona Maria", &["Alface"]).with_capacity("200 kg");
        (farmer, request)
    }

    fn context<'a>(farmer: &'a Farmer, request: &'a Request, negotiator: Option<&'a NegotiatorConfig>) -> OfferContext<'a> {
        OfferContext {
            farmer,
            request,
            market_value: 430.0,
            proposed_value: 365.5,
            negotiator,
        }
    }

    fn assert_is_fallback(message: &GeneratedMessage) {
        assert_eq!(message.source, MessageSource::Fallback);
        assert!(message.text.contains("Alimentação Escolar"));
        assert!(message.text.contains("20/11/2026"));
        assert!(message.text.contains("R$ 430,00"));
        assert!(message.text.contains("R$ 365,50"));
        assert!(message.text.contains("50 kg de Alface"));
        assert!(message.text.ends_with('?'));
    }

    #[tokio::test]
    async fn test_service_text_is_used() {
        let (farmer, request) = fixtures();
        let service = Arc::new(ScriptedTextService::new([ScriptedReply::text("  Olá, Dona Maria!  ")]));
        let generator = MessageGenerator::new(service.clone());

        let message = generator.generate(&context(&farmer, &request, None)).await;

        assert_eq!(message.source, MessageSource::Service);
        assert_eq!(message.text, "Olá, Dona Maria!");
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let (farmer, request) = fixtures();
        let service = Arc::new(ScriptedTextService::new([ScriptedReply::fail("connection reset")]));
        let generator = MessageGenerator::new(service);

        let message = generator.generate(&context(&farmer, &request, None)).await;
        assert_is_fallback(&message);
    }

    #[tokio::test]
    async fn test_blank_text_falls_back() {
        let (farmer, request) = fixtures();
        let service = Arc::new(ScriptedTextService::new([ScriptedReply::text(" \n ")]));
        let generator = MessageGenerator::new(service);

        let message = generator.generate(&context(&farmer, &request, None)).await;
        assert_is_fallback(&message);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let (farmer, request) = fixtures();
        let service = Arc::new(ScriptedTextService::new([ScriptedReply::Hang]));
        let generator = MessageGenerator::new(service).with_timeout(Duration::from_millis(20));

        let message = generator.generate(&context(&farmer, &request, None)).await;
        assert_is_fallback(&message);
    }

    #[tokio::test]
    async fn test_prompts_carry_persona_and_facts() {
        let (farmer, request) = fixtures();
        let negotiator = NegotiatorConfig {
            personality: "animado".to_string(),
            objectives: vec!["Fechar até sexta".to_string()],
            instructions: "Mencione a cooperativa".to_string(),
            ..Default::default()
        };
        let service = Arc::new(ScriptedTextService::new([ScriptedReply::text("ok")]));
        let generator = MessageGenerator::new(service.clone());

        generator
            .generate(&context(&farmer, &request, Some(&negotiator)))
            .await;

        let call = &service.calls()[0];
        assert!(call.system.contains("animado"));
        assert!(call.system.contains("- Fechar até sexta"));
        assert!(call.system.contains("Mencione a cooperativa"));
        assert!(call.user.contains("Dona Maria"));
        assert!(call.user.contains("30 kg de Tomate"));
        assert!(call.user.contains("R$ 365,50"));
        assert!(call.user.contains("200 kg"));
        assert_eq!(call.options, GenerateOptions::prose());
    }

    #[test]
    fn test_default_persona() {
        assert!(style_instruction(None).contains(DEFAULT_PERSONALITY));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_brl(374.5), "R$ 374,50");
        assert_eq!(format_quantity(12.0), "12");
        assert_eq!(format_quantity(2.5), "2,5");
    }
}
