/// Put the modules together: load variants and responses, build gene counts, train, report weights
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use plotters::prelude::*;

use gene_response::{
    align_labels, build_gene_level_features, get_feature_coefficients, load_labels,
    load_variants, train_logistic_regression,
};

/// Predict therapy response from per-gene variant counts.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV with columns patient_id, gene and optionally variant
    #[arg(short, long, default_value = "ngs_variants.csv")]
    variants: PathBuf,

    /// CSV with columns patient_id, response (0 or 1)
    #[arg(short, long, default_value = "responses.csv")]
    labels: PathBuf,

    /// Where to write the coefficient bar chart
    #[arg(short, long, default_value = "gene_coefficients.png")]
    plot: PathBuf,

    /// Skip writing the bar chart
    #[arg(long)]
    no_plot: bool,
}

/// Draws a horizontal bar chart of gene coefficients and saves it to `path`
/// input: gene names with their coefficients
/// logic: split "results" into names and values; compute X-axis range; set up PNG backend;
/// build Cartesian chart; label Y ticks with gene names; draw one bar per coefficient
fn plot_coefficients(results: &[(String, f64)], path: &Path) -> Result<(), Box<dyn Error>> {
    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    let coefs: Vec<f64> = results.iter().map(|(_, c)| *c).collect();
    let count = results.len();

    // Keep zero on the axis and pad both ends
    let min_x = coefs.iter().cloned().fold(0.0_f64, f64::min);
    let max_x = coefs.iter().cloned().fold(0.0_f64, f64::max);
    let pad = ((max_x - min_x) * 0.1).max(1e-3);
    let x_range = (min_x - pad)..(max_x + pad);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Gene Coefficients", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(200)
        .build_cartesian_2d(x_range, 0..count)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_labels(count)
        .y_label_formatter(&|idx| names.get(*idx).map(|n| n.to_string()).unwrap_or_default())
        .x_desc("Coefficient")
        .y_desc("Gene")
        .draw()?;

    chart.draw_series(coefs.iter().enumerate().map(|(i, &coef)| {
        let start = 0.0_f64.min(coef);
        let end = 0.0_f64.max(coef);
        let color = if coef >= 0.0 { BLUE } else { RED };
        Rectangle::new([(start, i), (end, i + 1)], color.mix(0.5).filled())
    }))?;

    root.present()?;
    Ok(())
}

/// load variants and labels, build features, train, and report
/// logic: "load_variants" -> "build_gene_level_features" -> "align_labels" ->
/// "train_logistic_regression" -> "get_feature_coefficients" with the matrix's own gene order
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 1) Load inputs
    let variants = load_variants(&args.variants)?;
    let labels = load_labels(&args.labels)?;

    // 2) Build features and line the labels up with them
    let counts = build_gene_level_features(&variants)?;
    info!(
        "Gene count matrix: {} patients x {} genes",
        counts.n_patients(),
        counts.n_genes()
    );
    let x = counts.to_feature_matrix();
    let y = align_labels(&x.row_labels, &labels)?;

    // 3) Train and read the weights back in column order
    let fitted = train_logistic_regression(&x, &y)?;
    info!(
        "Solver converged: {} (gradient norm {:.2e})",
        fitted.converged(),
        fitted.gradient_norm()
    );
    let coefficients = get_feature_coefficients(&fitted, &x.column_labels)?;
    let results = coefficients.sorted_by_magnitude();

    println!("\nGene coefficients:");
    for (name, coef) in &results {
        println!("{:<30} {:>8.4}", name, coef);
    }
    println!("{:<30} {:>8.4}", "(intercept)", fitted.intercept());

    println!("\nPredicted response:");
    let probs = fitted.predict_probabilities(&x.values)?;
    let classes = fitted.predict(&x.values)?;
    for (i, patient) in x.row_labels.iter().enumerate() {
        println!(
            "{:<30} {:>8.4}  predicted {}  observed {}",
            patient, probs[i], classes[i], y[i]
        );
    }

    // 4) Plot
    if !args.no_plot {
        plot_coefficients(&results, &args.plot)?;
        info!("Wrote {}", args.plot.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// whole pipeline on a small cohort where GeneA variants mark responders
    #[test]
    fn pipeline_reports_one_weight_per_gene() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let variants = dir.path().join("variants.csv");
        let responses = dir.path().join("responses.csv");
        fs::write(
            &variants,
            concat!(
                "patient_id,gene,variant\n",
                "P1,GeneA,c.1A>T\n",
                "P1,GeneA,c.7G>C\n",
                "P2,GeneA,c.1A>T\n",
                "P2,GeneB,c.3C>G\n",
                "P3,GeneB,c.3C>G\n",
                "P4,GeneB,c.9T>A\n",
                "P4,GeneC,c.2G>A\n",
                "P5,GeneA,c.5del\n",
            ),
        )?;
        fs::write(&responses, "patient_id,response\nP1,1\nP2,1\nP3,0\nP4,0\nP5,1\n")?;

        let counts = build_gene_level_features(&load_variants(&variants)?)?;
        let x = counts.to_feature_matrix();
        let y = align_labels(&x.row_labels, &load_labels(&responses)?)?;
        assert_eq!(y, vec![1, 1, 0, 0, 1]);

        let fitted = train_logistic_regression(&x, &y)?;
        let coefs = get_feature_coefficients(&fitted, &x.column_labels)?;
        assert_eq!(coefs.len(), 3);
        assert_eq!(coefs, fitted.labelled_coefficients());
        assert!(coefs.get("GeneA").unwrap() > 0.0);
        assert!(coefs.get("GeneB").unwrap() < 0.0);
        Ok(())
    }

    /// same signal with non-responders listed first and in the majority
    #[test]
    fn pipeline_sign_survives_majority_non_responders() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let variants = dir.path().join("variants.csv");
        let responses = dir.path().join("responses.csv");
        fs::write(
            &variants,
            concat!(
                "patient_id,gene,variant\n",
                "P1,GeneB,c.3C>G\n",
                "P2,GeneA,c.1A>T\n",
                "P2,GeneA,c.7G>C\n",
                "P3,GeneB,c.9T>A\n",
                "P4,GeneB,c.3C>G\n",
                "P4,GeneC,c.2G>A\n",
                "P5,GeneA,c.5del\n",
                "P5,GeneA,c.1A>T\n",
                "P6,GeneC,c.2G>A\n",
            ),
        )?;
        fs::write(
            &responses,
            "patient_id,response\nP1,0\nP2,1\nP3,0\nP4,0\nP5,1\nP6,0\n",
        )?;

        let x = build_gene_level_features(&load_variants(&variants)?)?.to_feature_matrix();
        let y = align_labels(&x.row_labels, &load_labels(&responses)?)?;
        assert_eq!(y, vec![0, 1, 0, 0, 1, 0]);

        let fitted = train_logistic_regression(&x, &y)?;
        let coefs = fitted.labelled_coefficients();
        assert!(coefs.get("GeneA").unwrap() > 0.0);

        let probs = fitted.predict_probabilities(&x.values)?;
        assert!(probs[1] > probs[0]);
        assert!(probs[4] > probs[2]);
        Ok(())
    }
}
