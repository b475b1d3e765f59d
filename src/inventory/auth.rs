//! ログイン判定とサインイン処理

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{Credentials, SettleTuning};
use crate::driver::{Locator, PageDriver};
use crate::error::ExtractorError;

/// ログイン画面の指標。いずれかが表示されていればログインが必要
const LOGIN_INDICATORS: [Locator; 4] = [
    Locator::Css("input[type='password']"),
    Locator::Css("#login-form"),
    Locator::Text {
        tag: "button",
        needle: "Login",
    },
    Locator::Text {
        tag: "button",
        needle: "Sign In",
    },
];

/// 指標1つあたりの表示待ちタイムアウト
const INDICATOR_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const USERNAME_INPUT: Locator =
    Locator::Css("input[type='text'], input[type='email'], input[name='username']");
const PASSWORD_INPUT: Locator = Locator::Css("input[type='password']");

/// ログインフォームの送信候補（順に試す）
const SUBMIT_CONTROLS: [Locator; 3] = [
    Locator::Text {
        tag: "button",
        needle: "Login",
    },
    Locator::Text {
        tag: "button",
        needle: "Sign In",
    },
    Locator::Css("input[type='submit']"),
];

/// 現在のページでログインが必要か判定する
///
/// 指標を順に短い表示待ちで探し、最初のヒットで打ち切る。
/// 判定エラーは「見つからない」扱い。
pub async fn login_required(page: &dyn PageDriver) -> bool {
    for indicator in &LOGIN_INDICATORS {
        let found = page
            .is_visible(indicator, INDICATOR_PROBE_TIMEOUT)
            .await
            .unwrap_or(false);
        if found {
            info!("Login indicator found: {}", indicator);
            return true;
        }
    }
    debug!("No login indicators found");
    false
}

/// ログインフォームに入力して送信し、成功を検証する
///
/// 送信後もログイン指標が残っていれば LoginVerification で失敗する。
/// リトライはしない。
pub async fn sign_in(
    page: &dyn PageDriver,
    credentials: &Credentials,
    settle: &SettleTuning,
) -> Result<(), ExtractorError> {
    info!("Signing in as {}", credentials.username);

    page.fill(&USERNAME_INPUT, &credentials.username).await?;
    page.fill(&PASSWORD_INPUT, &credentials.password).await?;

    let mut submitted = false;
    for control in &SUBMIT_CONTROLS {
        match page.click(control).await {
            Ok(()) => {
                debug!("Submitted login form via {}", control);
                submitted = true;
                break;
            }
            Err(e) => {
                debug!("Submit candidate {} unusable: {}", control, e);
            }
        }
    }
    if !submitted {
        return Err(ExtractorError::ElementNotFound(
            "ログインフォームの送信ボタン".to_string(),
        ));
    }

    page.wait_idle(settle.idle).await?;
    sleep(settle.post_login).await;

    if login_required(page).await {
        return Err(ExtractorError::LoginVerification);
    }

    info!("Sign-in verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakePage;

    fn instant_settle() -> SettleTuning {
        SettleTuning {
            idle: Duration::ZERO,
            post_nav: Duration::ZERO,
            post_login: Duration::ZERO,
            scroll: Duration::ZERO,
            iteration: Duration::ZERO,
        }
    }

    fn creds() -> Credentials {
        Credentials {
            username: "user@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_required_when_password_field_visible() {
        let page = FakePage::new();
        page.show(&LOGIN_INDICATORS[0]);
        assert!(login_required(&page).await);
    }

    #[tokio::test]
    async fn test_login_not_required_on_blank_page() {
        let page = FakePage::new();
        assert!(!login_required(&page).await);
    }

    #[tokio::test]
    async fn test_login_required_via_text_indicator() {
        let page = FakePage::new();
        page.show(&Locator::Text {
            tag: "button",
            needle: "Sign In",
        });
        assert!(login_required(&page).await);
    }

    #[tokio::test]
    async fn test_sign_in_fills_and_submits() {
        let page = FakePage::new();
        page.show(&PASSWORD_INPUT);
        page.place(&USERNAME_INPUT);
        page.place(&SUBMIT_CONTROLS[0]);
        // 送信後はログイン指標が消える
        page.swap_visible_on_click(&[]);

        sign_in(&page, &creds(), &instant_settle()).await.unwrap();

        let fills = page.fills.lock().unwrap().clone();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].1, "user@example.com");
        assert_eq!(fills[1].1, "secret");

        let clicks = page.clicks.lock().unwrap().clone();
        assert_eq!(clicks, vec![SUBMIT_CONTROLS[0].to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_falls_through_submit_cascade() {
        let page = FakePage::new();
        page.show(&PASSWORD_INPUT);
        page.place(&USERNAME_INPUT);
        // ボタンは無く、input[type='submit']だけある
        page.place(&SUBMIT_CONTROLS[2]);
        page.swap_visible_on_click(&[]);

        sign_in(&page, &creds(), &instant_settle()).await.unwrap();

        let clicks = page.clicks.lock().unwrap().clone();
        assert_eq!(clicks, vec![SUBMIT_CONTROLS[2].to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_fails_verification_when_form_persists() {
        let page = FakePage::new();
        page.show(&PASSWORD_INPUT);
        page.place(&USERNAME_INPUT);
        page.place(&SUBMIT_CONTROLS[0]);
        // クリック後もパスワード欄が表示されたまま

        let result = sign_in(&page, &creds(), &instant_settle()).await;
        assert!(matches!(result, Err(ExtractorError::LoginVerification)));
    }

    #[tokio::test]
    async fn test_sign_in_without_submit_control() {
        let page = FakePage::new();
        page.show(&PASSWORD_INPUT);
        page.place(&USERNAME_INPUT);

        let result = sign_in(&page, &creds(), &instant_settle()).await;
        assert!(matches!(result, Err(ExtractorError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_sign_in_without_form_fields() {
        let page = FakePage::new();
        let result = sign_in(&page, &creds(), &instant_settle()).await;
        assert!(matches!(result, Err(ExtractorError::ElementNotFound(_))));
    }
}
