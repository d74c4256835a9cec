use plotly::common::{DashType, Line, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Bar, Plot, Scatter};

use crate::metrics::{PrCurve, RocCurve};

/// Plot the per-round ROC curves with a chance reference line.
pub fn plot_roc_curves(curves: &[RocCurve], mean_auc: f64, title: &str) -> Plot {
    let mut plot = Plot::new();

    for (j, curve) in curves.iter().enumerate() {
        let trace = Scatter::new(curve.fpr.clone(), curve.tpr.clone())
            .mode(Mode::Lines)
            .name(format!("round {}", j + 1));
        plot.add_trace(trace);
    }

    let reference = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("chance")
        .line(Line::new().color("grey").dash(DashType::Dash));
    plot.add_trace(reference);

    plot.set_layout(
        Layout::new()
            .title(format!("{} (mean AUC-ROC = {:.3})", title, mean_auc))
            .x_axis(Axis::new().title("False positive rate"))
            .y_axis(Axis::new().title("True positive rate")),
    );
    plot
}

/// Plot the per-round precision-recall curves.
pub fn plot_pr_curves(curves: &[PrCurve], mean_auc: f64, title: &str) -> Plot {
    let mut plot = Plot::new();

    for (j, curve) in curves.iter().enumerate() {
        let trace = Scatter::new(curve.recall.clone(), curve.precision.clone())
            .mode(Mode::Lines)
            .name(format!("round {}", j + 1));
        plot.add_trace(trace);
    }

    plot.set_layout(
        Layout::new()
            .title(format!("{} (mean AUC-PRc = {:.3})", title, mean_auc))
            .x_axis(Axis::new().title("Recall"))
            .y_axis(Axis::new().title("Precision")),
    );
    plot
}

/// Bar chart of the true-positive overlap regions across compared runs.
pub fn plot_overlap_counts(labels: &[String], counts: &[usize], title: &str) -> Plot {
    let mut plot = Plot::new();

    let trace = Bar::new(labels.to_vec(), counts.to_vec()).name("true positives");
    plot.add_trace(trace);

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Region"))
            .y_axis(Axis::new().title("Instance count")),
    );
    plot
}
