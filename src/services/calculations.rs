//! Body-metric helpers used by the athlete app endpoints. Pure functions,
//! no unit conversion: weight in kg, height in cm (BMR) or m (BMI).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Intense,
    Athlete,
}

impl ActivityLevel {
    fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Intense => 1.725,
            ActivityLevel::Athlete => 1.9,
        }
    }
}

/// Basal metabolic rate, Mifflin-St Jeor.
pub fn bmr(weight_kg: f64, height_cm: f64, age_years: u32, sex: Sex) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age_years);
    match sex {
        Sex::Male => base + 5.0,
        Sex::Female => base - 161.0,
    }
}

/// Body mass index, rounded to one decimal.
pub fn bmi(weight_kg: f64, height_m: f64) -> f64 {
    let raw = weight_kg / (height_m * height_m);
    (raw * 10.0).round() / 10.0
}

pub fn tdee(bmr: f64, level: ActivityLevel) -> f64 {
    bmr * level.multiplier()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroSplit {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Split a calorie target into macros: 30% protein, 40% carbs, 30% fat.
/// Protein and carbs at 4 kcal/g, fat at 9 kcal/g.
pub fn macro_split(calories: f64) -> MacroSplit {
    MacroSplit {
        protein_g: calories * 0.30 / 4.0,
        carbs_g: calories * 0.40 / 4.0,
        fat_g: calories * 0.30 / 9.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmr_male_reference_case() {
        // 10*70 + 6.25*175 - 5*30 + 5
        assert_eq!(bmr(70.0, 175.0, 30, Sex::Male), 1648.75);
    }

    #[test]
    fn bmr_female_subtracts_constant() {
        assert_eq!(bmr(60.0, 165.0, 25, Sex::Female), 1345.25);
    }

    #[test]
    fn bmi_reference_case() {
        assert_eq!(bmi(70.0, 1.75), 22.9);
    }

    #[test]
    fn tdee_applies_the_activity_multiplier() {
        assert_eq!(tdee(1600.0, ActivityLevel::Sedentary), 1920.0);
        assert_eq!(tdee(1600.0, ActivityLevel::Moderate), 2480.0);
    }

    #[test]
    fn macro_split_covers_the_calorie_target() {
        let split = macro_split(2000.0);
        let total = split.protein_g * 4.0 + split.carbs_g * 4.0 + split.fat_g * 9.0;
        assert!((total - 2000.0).abs() < 1e-9);
    }
}
