use figment::Jail;

use related_core::config::{Config, EmbeddingSettings, RunSettings};

#[test]
fn empty_config_uses_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "dev");
        let config = Config::load().expect("load");
        let run = config.run_settings().expect("run settings");
        assert_eq!(run.k, 5);
        assert_eq!(run.input_path, "input.json");
        assert_eq!(run.output_path, "output.txt");
        assert_eq!(run.embed_concurrency, 1);
        assert_eq!(config.embedding_settings().expect("embedding"), EmbeddingSettings::default());
        Ok(())
    });
}

#[test]
fn env_file_and_variables_layer_over_base() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.create_file(
            "config.toml",
            r#"
            [related]
            k = 3
            input_path = "posts.json"

            [embedding]
            max_len = 64
            "#,
        )?;
        jail.create_file("config.test.toml", "[embedding]\nfake = true\n")?;
        jail.set_env("APP_RELATED__K", "7");

        let config = Config::load().expect("load");
        let run = config.run_settings().expect("run settings");
        assert_eq!(run.k, 7, "env var wins over files");
        assert_eq!(run.input_path, "posts.json");
        assert_eq!(run.output_path, RunSettings::default().output_path);

        let embedding = config.embedding_settings().expect("embedding");
        assert!(embedding.fake);
        assert_eq!(embedding.max_len, 64);
        Ok(())
    });
}

#[test]
fn production_rejects_fake_embeddings() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        jail.create_file("config.toml", "[embedding]\nfake = true\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn production_rejects_fake_embeddings_from_the_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        jail.set_env("APP_USE_FAKE_EMBEDDINGS", "1");
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn overrides_are_checked_against_the_environment() {
    Jail::expect_with(|jail| {
        let forced = EmbeddingSettings { fake: true, ..EmbeddingSettings::default() };

        jail.set_env("RUST_ENV", "prod");
        let prod = Config::load().expect("load");
        assert!(!prod.embedding_settings().expect("embedding").fake);
        assert!(prod.check_embedding(&forced).is_err());

        jail.set_env("RUST_ENV", "test");
        let test = Config::load().expect("load");
        assert!(test.check_embedding(&forced).is_ok());
        Ok(())
    });
}

#[test]
fn zero_batch_size_is_invalid() {
    let settings = RunSettings { batch_size: 0, ..RunSettings::default() };
    assert!(settings.validate().is_err());
    assert!(RunSettings { k: 0, ..RunSettings::default() }.validate().is_ok(), "k = 0 is allowed");
}
