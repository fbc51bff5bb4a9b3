use crate::domain::{purchase::Purchase, track::Track};

const RULE: &str = "=========================================";
const THIN_RULE: &str = "-----------------------------------------";

/// Plain-text payment receipt ("comprovativo"), built from the purchase alone.
pub fn render_receipt(purchase: &Purchase, track: &Track, entity: &str) -> String {
    [
        RULE.to_string(),
        "      MUVUKA MUSIC - COMPROVATIVO".to_string(),
        RULE.to_string(),
        format!("ID DA TRANSAÇÃO: {}", purchase.id),
        format!("DATA: {}", purchase.display_date()),
        format!("ENTIDADE: {entity}"),
        format!("REFERÊNCIA: {}", purchase.reference),
        THIN_RULE.to_string(),
        format!("ITEM: {}", track.title),
        format!("ARTISTA: {}", track.artist),
        format!("VALOR: {}", purchase.amount),
        "STATUS: PAGO COM SUCESSO".to_string(),
        THIN_RULE.to_string(),
        "Obrigado por apoiar a música angolana!".to_string(),
        "Muvuka Digital S.A.".to_string(),
        RULE.to_string(),
    ]
    .join("\n")
}
