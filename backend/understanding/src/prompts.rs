//! Prompt text for both stages.
//!
//! The Stage 2 system prompt is `language_directive + schema_instruction`.
//! The schema half is a constant per scan type and never varies with the
//! language, so the only difference between two languages' prompts is the
//! directive line.

use sanjeevani_core::{Language, ScanType};

const MEDICINE_READING_PROMPT: &str = "\
You are a medical OCR specialist reading a photographed medicine package or strip.
Extract, exactly as printed:
- the medicine name and brand name
- every active salt/ingredient with its strength (e.g. Paracetamol 500mg)
- the dosage form (tablet, capsule, syrup, injection, ...)
- the manufacturer
- every date on the pack, labelled MFG, EXP or Unknown
Do not guess missing text. Do not analyse, explain or translate.
Return ONLY the raw extracted text.";

const PRESCRIPTION_READING_PROMPT: &str = "\
You are reading a handwritten or printed medical prescription.
Extract the doctor's name and qualification, the patient's name and age, the date,
the diagnosis if written, and every prescribed medicine with its dosage, frequency,
timing and duration, in the order written.

Doctors write in shorthand. Expand it instead of copying it literally:
- OD = once daily, BD/BID = twice daily, TDS/TID = three times daily, QID = four times daily
- HS = at bedtime, SOS/PRN = only when needed, STAT = immediately
- AC = before meals, PC = after meals, CC = with meals, empty stomach = before food
- Tab = tablet, Cap = capsule, Syp = syrup, Inj = injection, Oint = ointment, gtt = drops
- 1-0-1 style patterns are morning-afternoon-night counts
- x 5d / x 1w = duration of 5 days / 1 week

Return ONLY the raw extracted text, one medicine per line. Do not add advice.";

const MEDICINE_SCHEMA: &str = r#"
Return a single JSON object with exactly these keys:
{
  "medicine_name": "string, generic name of the main medicine",
  "brand": "string",
  "manufacturer": "string",
  "active_salts": ["string, salt with strength"],
  "dosage_strength": "normal | high",
  "is_high_dosage": false,
  "dosage_info": "string, usual dosage",
  "conditions": ["string, conditions it treats"],
  "what_it_does": "string",
  "suitable_age_group": "string",
  "extracted_expiry_text": "string, the raw date text after EXP or Expiry, empty if none",
  "advice": "string, short safety advice in the target language",
  "advice_en": "string, the same advice in English",
  "is_medicine": true
}
If the text does not describe a medicine, set "is_medicine" to false and explain in "advice".
Output the JSON object only: no markdown, no prose before or after it."#;

const PRESCRIPTION_SCHEMA: &str = r#"
Return a single JSON object with exactly these keys:
{
  "doctor_info": {"name": "string", "qualification": "string"},
  "patient_info": {"name": "string", "age": "string", "date": "string"},
  "diagnosis": "string",
  "medicines": [
    {
      "name": "string",
      "dosage": "string, e.g. 500mg or 10ml",
      "form": "string",
      "frequency": "string, e.g. 2 times a day",
      "timing": "string, e.g. morning and night",
      "duration": "string",
      "meal_relation": "before breakfast | after breakfast | before meals | after meals | with food | empty stomach | at bedtime | anytime",
      "active_salts": ["string"],
      "alternatives": ["string"],
      "purpose": "string",
      "side_effects": ["string"],
      "food_interaction": "string",
      "warnings": "string",
      "is_antibiotic": false,
      "special_instructions": "string",
      "order": 1
    }
  ],
  "interactions": ["string"],
  "overall_advice": "string, conversational summary of how to take these medicines, in the target language",
  "overall_advice_en": "string, the same summary in English",
  "diet_advice": "string",
  "follow_up": "string"
}
Keep "order" as the sequence the patient should take the medicines, preserving the prescription's own order.
Output the JSON object only: no markdown, no prose before or after it."#;

/// Stage 1 instruction for the vision model.
pub fn reading_prompt(scan_type: ScanType) -> &'static str {
    match scan_type {
        ScanType::Medicine => MEDICINE_READING_PROMPT,
        ScanType::Prescription => PRESCRIPTION_READING_PROMPT,
    }
}

/// Stage 2 output contract. Independent of language.
pub fn schema_instruction(scan_type: ScanType) -> &'static str {
    match scan_type {
        ScanType::Medicine => MEDICINE_SCHEMA,
        ScanType::Prescription => PRESCRIPTION_SCHEMA,
    }
}

/// The line that pins the response language.
pub fn language_directive(language: Language) -> String {
    format!(
        "You are a careful pharmacist explaining medicines to a patient. \
         Target language: {} (code \"{}\"). Write the advice fields in {} only; \
         keep every other value and every key in English.",
        language.name(),
        language.code(),
        language.name()
    )
}

pub fn analysis_system_prompt(scan_type: ScanType, language: Language) -> String {
    let mut prompt = language_directive(language);
    prompt.push_str(schema_instruction(scan_type));
    prompt
}

/// Stage 2 user turn: the Stage 1 text, verbatim.
pub fn analysis_user_prompt(scan_type: ScanType, extracted_text: &str) -> String {
    format!(
        "Text read from the {} image:\n<<<\n{}\n>>>",
        scan_type.as_str(),
        extracted_text
    )
}
