//! Ordered locator candidates for the interactive publish surface
//!
//! Every control carries multiple candidates to tolerate UI revisions and
//! localization drift; the attempt primitive tries them in order and the
//! first match wins. Visible-text candidates come last since they are the
//! most locale-sensitive.

use serde::{Deserialize, Serialize};

use super::session::Locator;
use crate::models::PrivacyStatus;

/// Locator candidate lists for every control the state machine touches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceSelectors {
    /// Signals confirming an authenticated state
    pub auth_signals: Vec<Locator>,

    /// Upload entry point on the studio dashboard
    pub upload_entry: Vec<Locator>,

    /// Hidden file input accepting the media asset
    pub file_input: Vec<Locator>,

    /// Title text field on the metadata panel
    pub title_field: Vec<Locator>,

    /// Description text field on the metadata panel
    pub description_field: Vec<Locator>,

    /// File input accepting a custom thumbnail
    pub thumbnail_input: Vec<Locator>,

    /// Fixed content-classification control ("not made for kids")
    pub content_classification: Vec<Locator>,

    /// "Next" controls advancing through the dialog pages
    pub next_button: Vec<Locator>,

    /// End-of-video template picker (long-form only, optional)
    pub end_template: Vec<Locator>,

    /// Visibility radio controls, per privacy level
    pub visibility_public: Vec<Locator>,
    pub visibility_unlisted: Vec<Locator>,
    pub visibility_private: Vec<Locator>,

    /// Intermediate save control some surface versions require
    pub intermediate_save: Vec<Locator>,

    /// Terminal publish control
    pub publish_button: Vec<Locator>,

    /// Success indicator exposing the shareable URL
    pub share_link: Vec<Locator>,

    /// Control dismissing the success dialog
    pub close_dialog: Vec<Locator>,
}

impl SurfaceSelectors {
    /// Visibility candidates for the requested privacy level
    pub fn visibility(&self, privacy: PrivacyStatus) -> &[Locator] {
        match privacy {
            PrivacyStatus::Public => &self.visibility_public,
            PrivacyStatus::Unlisted => &self.visibility_unlisted,
            PrivacyStatus::Private => &self.visibility_private,
        }
    }
}

impl Default for SurfaceSelectors {
    fn default() -> Self {
        Self {
            auth_signals: vec![
                Locator::css("#avatar-btn"),
                Locator::css("ytcp-topbar-account-button"),
                Locator::css("img[alt*='프로필']"),
                Locator::xpath("//button[@aria-label='Account']"),
            ],
            upload_entry: vec![
                Locator::css("#create-icon"),
                Locator::css("ytcp-button#create-button"),
                Locator::xpath("//button[@aria-label='만들기']"),
                Locator::text("동영상 업로드"),
            ],
            file_input: vec![
                Locator::css("input[type='file']"),
                Locator::css("#select-files-button input"),
            ],
            title_field: vec![
                Locator::css("#title-textarea #textbox"),
                Locator::css("ytcp-social-suggestions-textbox[label='제목'] #textbox"),
                Locator::xpath("//div[@id='textbox' and contains(@aria-label, 'title')]"),
            ],
            description_field: vec![
                Locator::css("#description-textarea #textbox"),
                Locator::css("ytcp-social-suggestions-textbox[label='설명'] #textbox"),
            ],
            thumbnail_input: vec![
                Locator::css("#file-loader input[type='file']"),
                Locator::css("ytcp-thumbnail-uploader input[type='file']"),
            ],
            content_classification: vec![
                Locator::css("tp-yt-paper-radio-button[name='VIDEO_MADE_FOR_KIDS_NOT_MFK']"),
                Locator::xpath("//tp-yt-paper-radio-button[.//div[contains(text(),'아니요')]]"),
            ],
            next_button: vec![
                Locator::css("#next-button"),
                Locator::css("ytcp-button#next-button button"),
                Locator::text("다음"),
            ],
            end_template: vec![
                Locator::css("#endscreens-button"),
                Locator::xpath("//ytcp-video-metadata-editor-sidepanel//button[1]"),
            ],
            visibility_public: vec![
                Locator::css("tp-yt-paper-radio-button[name='PUBLIC']"),
                Locator::text("공개"),
            ],
            visibility_unlisted: vec![
                Locator::css("tp-yt-paper-radio-button[name='UNLISTED']"),
                Locator::text("일부 공개"),
            ],
            visibility_private: vec![
                Locator::css("tp-yt-paper-radio-button[name='PRIVATE']"),
                Locator::text("비공개"),
            ],
            intermediate_save: vec![
                Locator::css("#save-button"),
                Locator::css("ytcp-button#done-button button"),
            ],
            publish_button: vec![
                Locator::css("#done-button"),
                Locator::css("ytcp-button#done-button"),
                Locator::text("게시"),
            ],
            share_link: vec![
                Locator::css("a.ytcp-video-info"),
                Locator::css("#share-url"),
                Locator::xpath("//a[contains(@href, 'watch?v=')]"),
            ],
            close_dialog: vec![
                Locator::css("#close-button"),
                Locator::text("닫기"),
            ],
        }
    }
}
