//! `symq calc`: print ideal body proportions.

use anyhow::Result;

pub use symmetriq_core::calculator::{ideal_proportions, v_taper, Measurements, VTaper};
use symmetriq_core::calculator::GOLDEN_RATIO;

/// Render the proportions table and V-taper verdict.
pub fn render(m: &Measurements) -> String {
    let proportions = ideal_proportions(m);
    let mut out = String::new();

    out.push_str("Ideal Measurements\n");
    out.push_str(&format!("{:<12} {:>22}\n", "Body Part", "Ideal Measurement (in)"));
    for (part, inches) in proportions.rows() {
        out.push_str(&format!("{:<12} {:>22.2}\n", part, inches));
    }

    match v_taper(m) {
        Some(VTaper::Short { ratio, inches }) => {
            out.push_str(&format!(
                "\nShoulder to Waist Ratio: {:.2} (Target: {})\n",
                ratio, GOLDEN_RATIO
            ));
            out.push_str(&format!(
                "You may need to add approximately {:.2} inches to your shoulders to achieve the ideal V-taper.\n",
                inches
            ));
        }
        Some(VTaper::Achieved { ratio }) => {
            out.push_str(&format!(
                "\nShoulder to Waist Ratio: {:.2} (Target: {})\n",
                ratio, GOLDEN_RATIO
            ));
            out.push_str("You have achieved or exceeded the golden ratio V-taper.\n");
        }
        None => {}
    }
    out
}

pub fn run_calc(m: &Measurements) -> Result<()> {
    m.validate()?;
    print!("{}", render(m));
    Ok(())
}
