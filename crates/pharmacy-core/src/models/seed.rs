//! Sample catalog used to seed an empty store.

use super::NewMedicine;

const SAMPLE: [(&str, &str, &str, &str, u32); 17] = [
    ("Panadol", "Paracetamol", "500 mg", "Tablet", 0),
    ("Tylenol", "Paracetamol", "325 mg", "Tablet", 25),
    ("Calpol", "Paracetamol", "120 mg/5ml", "Syrup", 15),
    ("Aspirin", "Acetylsalicylic acid", "75 mg", "Tablet", 40),
    ("Ecospirin", "Acetylsalicylic acid", "150 mg", "Tablet", 8),
    ("Ibuprofen", "Ibuprofen", "200 mg", "Capsule", 3),
    ("Advil", "Ibuprofen", "400 mg", "Tablet", 22),
    ("Brufen", "Ibuprofen", "600 mg", "Tablet", 12),
    ("Amoxicillin", "Amoxicillin", "250 mg", "Capsule", 2),
    ("Augmentin", "Amoxicillin", "500 mg", "Tablet", 18),
    ("Omeprazole", "Omeprazole", "20 mg", "Tablet", 30),
    ("Prilosec", "Omeprazole", "40 mg", "Capsule", 14),
    ("Losec", "Omeprazole", "10 mg", "Tablet", 0),
    ("Cetirizine", "Cetirizine", "10 mg", "Tablet", 35),
    ("Zyrtec", "Cetirizine", "5 mg/5ml", "Syrup", 20),
    ("Metformin", "Metformin", "500 mg", "Tablet", 45),
    ("Glucophage", "Metformin", "850 mg", "Tablet", 28),
];

/// The default sample catalog.
pub fn default_catalog() -> Vec<NewMedicine> {
    SAMPLE
        .iter()
        .map(|(name, formula, dosage, formulation, stock)| NewMedicine {
            name: name.to_string(),
            formula: formula.to_string(),
            dosage: dosage.to_string(),
            formulation: formulation.to_string(),
            stock: *stock,
        })
        .collect()
}
