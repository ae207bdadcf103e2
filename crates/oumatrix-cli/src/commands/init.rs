//! The `oumatrix init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create oumatrix.toml
    if std::path::Path::new("oumatrix.toml").exists() {
        println!("oumatrix.toml already exists, skipping.");
    } else {
        std::fs::write("oumatrix.toml", SAMPLE_CONFIG)?;
        println!("Created oumatrix.toml");
    }

    // Create example form
    std::fs::create_dir_all("forms")?;
    let example_path = std::path::Path::new("forms/example.toml");
    if example_path.exists() {
        println!("forms/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_FORM)?;
        println!("Created forms/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: oumatrix validate --form forms/example.toml");
    println!("  2. Run: oumatrix save --form forms/example.toml --question 1");
    println!("  3. Run: oumatrix show --question 1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# oumatrix configuration

[defaults]
input_mode = "single"
grade_method = "partial"
shuffle_answers = true
shown_num_correct = true

[limits]
min_columns = 2
min_rows = 2

[feedback]
correct = "Your answer is correct."
partially_correct = "Your answer is partially correct."
incorrect = "Your answer is incorrect."

[store]
type = "file"
path = "./oumatrix-data"
"#;

const EXAMPLE_FORM: &str = r#"input_mode = "multiple"
grade_method = "partial"
shuffle_answers = true
columns = ["Insect", "Fish", "Mammal"]

[[rows]]
name = "Bee"
correct = [1]

[[rows]]
name = "Salmon"
correct = [2]
feedback = "<p>Salmon breathe through gills.</p>"

[[rows]]
name = "Whale"
correct = [3]

[combined_feedback]
correct = "Well done."
partially_correct = "Some rows are right."
incorrect = "Have another look."

[[hints]]
text = "Think about which animals breathe air."
show_row_feedback = true

[[hints]]
text = "Whales are not fish."
shown_num_correct = true
clear_wrong = true
"#;
