//! End-to-end tests for the extension lifecycle commands.
//!
//! These tests verify that:
//! - disable/enable rename files without touching their bytes
//! - a disabled extension's commands vanish after the automatic reload
//! - user aliases win over aliases declared by extensions

use std::fs;

use mugs_cli::command::Flow;
use mugs_tests::ShellFixture;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn disable_then_enable_round_trips_bytes() {
    let mut fixture = ShellFixture::golden();
    fixture.shell.load_all().await;

    let enabled = fixture.extensions_dir().join("greet.star");
    let disabled = fixture.extensions_dir().join("greet.star.disable");
    let original = fs::read(&enabled).unwrap();

    assert_eq!(fixture.shell.dispatch("disable greet").await, Flow::Continue);
    assert!(!enabled.exists());
    assert_eq!(fs::read(&disabled).unwrap(), original);
    assert!(fixture.reporter.contains("Extension 'greet.star' disabled"));

    assert_eq!(fixture.shell.dispatch("enable greet").await, Flow::Continue);
    assert!(!disabled.exists());
    assert_eq!(fs::read(&enabled).unwrap(), original);
    assert!(fixture.shell.registry().resolve("greet").is_some());
}

#[tokio::test]
async fn disabled_extension_is_not_found_after_reload() {
    let mut fixture = ShellFixture::golden();
    fixture.shell.load_all().await;

    fixture.shell.dispatch("disable greet").await;
    fixture.reporter.clear();

    assert!(fixture.shell.registry().resolve("greet").is_none());
    assert!(fixture.shell.registry().resolve("hi").is_none());

    fixture.shell.dispatch("greet world").await;
    let errors = fixture.reporter.errors();
    assert_eq!(errors[0].key, "command_not_found");

    // A fresh shell over the same directory agrees.
    let (_, mut shell) = fixture.restart();
    shell.load_all().await;
    assert!(shell.registry().resolve("greet").is_none());
}

#[tokio::test]
async fn list_shows_disabled_extensions() {
    let mut fixture = ShellFixture::golden();
    fixture.shell.load_all().await;
    fixture.shell.dispatch("disable tools.bzl").await;
    fixture.reporter.clear();

    fixture.shell.dispatch("list").await;
    assert!(fixture.reporter.contains("tools.bzl.disable"));
    assert!(fixture.shell.registry().resolve("shout").is_none());
}

#[tokio::test]
async fn enable_unknown_extension_reports_error() {
    let mut fixture = ShellFixture::golden();
    fixture.shell.load_all().await;
    fixture.reporter.clear();

    fixture.shell.dispatch("enable nothing.star.disable").await;
    assert_eq!(fixture.reporter.errors()[0].key, "extension_not_found");
}

#[tokio::test]
async fn user_alias_takes_precedence_over_declared_alias() {
    let mut fixture = ShellFixture::empty();
    fixture.add_extension(
        "bar.star",
        "command(name = 'bar', aliases = ['g'], execute = lambda args: respond('bar'))\n",
    );
    fixture.add_extension(
        "foo.star",
        "command(name = 'foo', execute = lambda args: respond('foo'))\n",
    );
    fixture.shell.load_all().await;

    fixture.shell.dispatch("g").await;
    assert_eq!(fixture.texts(), vec!["bar"]);

    fixture.shell.dispatch("alias add foo g").await;
    fixture.reporter.clear();
    fixture.shell.dispatch("g").await;
    assert_eq!(fixture.texts(), vec!["foo"]);

    // Persisted aliases apply to a fresh shell too.
    let (reporter, mut shell) = fixture.restart();
    shell.load_all().await;
    shell.dispatch("g").await;
    let texts: Vec<_> = reporter.responses().into_iter().map(|e| e.text).collect();
    assert_eq!(texts, vec!["foo"]);
}
