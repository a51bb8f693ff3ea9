use sigma_insight::capability::SpecLimits;
use sigma_insight::correlation::CorrelationMethod;
use sigma_insight::csv_parser::CsvParser;
use sigma_insight::outliers::OutlierMethod;
use sigma_insight::{
    analyze, AnalysisConfig, AnalysisError, AnalysisRequest, AnalysisResult, ErrorKind,
    Interpretation,
};
use tracing_subscriber::EnvFilter;

const MOLDING_RUN: &str = "\
timestamp,cavity,temperature,pressure,weight,defect
2024-05-02 08:00:00,A,201.5,80.1,12.02,flash
2024-05-02 08:10:00,A,202.1,80.4,12.05,ok
2024-05-02 08:20:00,A,200.9,79.8,11.98,short shot
2024-05-02 08:30:00,A,201.8,80.2,12.03,ok
2024-05-02 08:40:00,B,204.2,81.5,12.21,flash
2024-05-02 08:50:00,B,204.8,81.9,12.26,flash
2024-05-02 09:00:00,B,203.9,81.2,12.18,sink
2024-05-02 09:10:00,B,204.5,81.6,NA,flash
2024-05-02 09:20:00,C,199.2,79.1,11.90,ok
2024-05-02 09:30:00,C,198.8,78.8,11.86,short shot
2024-05-02 09:40:00,C,199.5,79.3,11.93,ok
2024-05-02 09:50:00,C,199.0,79.0,11.88,flash
";

/// Routes engine logs to the test harness; `RUST_LOG=sigma_insight=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn run(request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
    init_tracing();
    let df = CsvParser::new().parse_str(MOLDING_RUN).expect("fixture parses");
    analyze(&df, &request, &AnalysisConfig::default())
}

#[test]
fn descriptive_skips_non_numeric_columns() {
    let AnalysisResult::Descriptive { columns } =
        run(AnalysisRequest::Descriptive { columns: None }).unwrap()
    else {
        panic!("wrong variant");
    };
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["temperature", "pressure", "weight"]);
    let weight = &columns[2];
    assert_eq!(weight.count, 11);
    assert_eq!(weight.missing, 1);
}

#[test]
fn cavities_differ() {
    let AnalysisResult::GroupComparison(anova) = run(AnalysisRequest::GroupComparison {
        value_column: "temperature".into(),
        group_column: "cavity".into(),
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert!(anova.significant);
    assert_eq!(anova.interpretation, Interpretation::GroupsDiffer);
    let tukey = anova.post_hoc.expect("post-hoc runs after a significant ANOVA");
    assert_eq!(tukey.comparisons.len(), 3);
    assert!(tukey.to_string().contains("Tukey HSD"));
}

#[test]
fn temperature_drives_weight() {
    let AnalysisResult::Correlation(corr) = run(AnalysisRequest::Correlation {
        method: CorrelationMethod::Pearson,
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    let r = corr.get("temperature", "weight").unwrap();
    assert!(r > 0.9);
    assert_eq!(corr.get("weight", "temperature"), Some(r));

    let AnalysisResult::Regression(fit) = run(AnalysisRequest::Regression {
        response: "weight".into(),
        predictors: vec!["temperature".into()],
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(fit.n_observations, 11);
    assert!(fit.r_squared > 0.8);
    assert!(fit.coefficients[1].estimate > 0.0);
}

#[test]
fn capability_and_control() {
    let AnalysisResult::Capability(report) = run(AnalysisRequest::Capability {
        column: "weight".into(),
        limits: SpecLimits::two_sided(11.5, 12.5).with_target(12.0),
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(report.n, 11);
    assert!(report.small_sample);
    let indices = report.indices.unwrap();
    assert!(indices.cpk <= indices.cp.unwrap());
    assert!(report.target.unwrap().cpm.is_some());

    let AnalysisResult::ControlChart(chart) = run(AnalysisRequest::ControlChart {
        column: "pressure".into(),
        order_column: Some("timestamp".into()),
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(chart.n, 12);
    assert!(chart.in_control);
}

#[test]
fn pareto_of_defects() {
    let AnalysisResult::Pareto(pareto) = run(AnalysisRequest::Pareto {
        category_column: "defect".into(),
        value_column: None,
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert_eq!(pareto.items[0].category, "flash");
    assert_eq!(pareto.items[0].total, 5.0);
    assert_eq!(pareto.grand_total, 12.0);
}

#[test]
fn small_samples_and_bad_requests() {
    let AnalysisResult::Outliers(outliers) = run(AnalysisRequest::Outliers {
        column: "pressure".into(),
        method: OutlierMethod::Zscore,
    })
    .unwrap() else {
        panic!("wrong variant");
    };
    assert!(outliers.indices.is_empty());

    let err = run(AnalysisRequest::TwoSample {
        value_column: "weight".into(),
        group_column: "cavity".into(),
        group_a: "A".into(),
        group_b: "Z".into(),
    })
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSelection);

    let err = run(AnalysisRequest::Regression {
        response: "weight".into(),
        predictors: vec!["temperature".into(), "pressure".into(), "timestamp".into()],
    })
    .unwrap_err();
    assert!(matches!(err, AnalysisError::NonNumericColumn { .. }));
}

#[test]
fn results_serialize_with_kind_tag() {
    let result = run(AnalysisRequest::Normality {
        column: "temperature".into(),
    })
    .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["kind"], "normality");
    assert_eq!(json["n"], 12);
    assert!(json["anderson_darling"]["status"].is_string());
}
