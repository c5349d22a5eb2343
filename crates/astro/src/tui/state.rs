//! セットアップウィザードの状態
//!
//! 端末に依存しない純粋な状態機械です。キー入力を `handle` に渡すと
//! 次の状態と結果（継続・確定・中止）が決まります。

use astro_core::{
    Addon, Choice, Dashboard, Gateway, GpuVendor, MediaServer, ProbedCapabilities, Selection,
    TorrentClient, Transcoding, UsenetClient, VpnProvider,
};

/// ウィザードの設問
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Welcome,
    MediaServer,
    Torrent,
    UsenetEnabled,
    UsenetClient,
    Gateway,
    Dashboard,
    Addons,
    Transcoding,
    VpnEnabled,
    VpnProvider,
    Summary,
}

impl Prompt {
    /// 表示順
    const ORDER: [Prompt; 12] = [
        Self::Welcome,
        Self::MediaServer,
        Self::Torrent,
        Self::UsenetEnabled,
        Self::UsenetClient,
        Self::Gateway,
        Self::Dashboard,
        Self::Addons,
        Self::Transcoding,
        Self::VpnEnabled,
        Self::VpnProvider,
        Self::Summary,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Welcome => "ようこそ",
            Self::MediaServer => "メディアサーバー",
            Self::Torrent => "トレントクライアント",
            Self::UsenetEnabled => "Usenet",
            Self::UsenetClient => "Usenet クライアント",
            Self::Gateway => "リバースプロキシ",
            Self::Dashboard => "ダッシュボード",
            Self::Addons => "追加サービス",
            Self::Transcoding => "ハードウェアトランスコード",
            Self::VpnEnabled => "VPN",
            Self::VpnProvider => "VPN プロバイダー",
            Self::Summary => "確認",
        }
    }

    fn is_multi_select(&self) -> bool {
        matches!(self, Self::Addons)
    }
}

/// ウィザードへの入力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    /// Space: 複数選択の切り替え
    Toggle,
    /// Enter
    Confirm,
    /// Backspace
    Back,
    /// Esc / q
    Abort,
}

/// 入力を処理した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Continue,
    Confirmed(Selection),
    Aborted,
}

/// メニューの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub description: String,
    /// 複数選択のときだけ Some
    pub checked: Option<bool>,
}

impl MenuItem {
    fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            checked: None,
        }
    }

    fn from_choice<T: Choice>(choice: T) -> Self {
        Self::new(choice.label(), choice.description())
    }
}

const YES_NO: [bool; 2] = [true, false];

#[derive(Debug, Clone)]
pub struct WizardState {
    selection: Selection,
    gpus: Vec<GpuVendor>,
    /// VPN の認証情報が設定されているか
    vpn_available: bool,
    prompt: Prompt,
    history: Vec<Prompt>,
    cursor: usize,
}

impl WizardState {
    /// `initial` は前回の回答（なければ既定値）
    pub fn new(initial: Selection, capabilities: &ProbedCapabilities) -> Self {
        let mut state = Self {
            selection: initial,
            gpus: capabilities.gpus.iter().copied().collect(),
            vpn_available: true,
            prompt: Prompt::Welcome,
            history: Vec::new(),
            cursor: 0,
        };
        state.sanitize();
        state
    }

    /// VPN の認証情報がないときは VPN の設問を出さない
    pub fn with_vpn_available(mut self, available: bool) -> Self {
        self.vpn_available = available;
        self.sanitize();
        self
    }

    pub fn prompt(&self) -> Prompt {
        self.prompt
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// GPU が1つも検出されなかったか
    pub fn gpu_missing(&self) -> bool {
        self.gpus.is_empty()
    }

    /// 何問目か（1 始まり）と全体の問数
    pub fn progress(&self) -> (usize, usize) {
        let total = Prompt::ORDER
            .iter()
            .filter(|p| **p != Prompt::Welcome && self.applies(**p))
            .count();
        (self.history.len(), total)
    }

    pub fn handle(&mut self, key: Key) -> Transition {
        match key {
            Key::Abort => return Transition::Aborted,
            Key::Up => self.cursor = self.cursor.saturating_sub(1),
            Key::Down => {
                let len = self.items().len();
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Key::Toggle => {
                if self.prompt.is_multi_select() {
                    self.toggle_addon();
                }
            }
            Key::Back => self.go_back(),
            Key::Confirm => {
                if self.prompt == Prompt::Summary {
                    return Transition::Confirmed(self.selection.clone());
                }
                self.commit();
                self.advance();
            }
        }
        Transition::Continue
    }

    /// 現在の設問の選択肢
    pub fn items(&self) -> Vec<MenuItem> {
        match self.prompt {
            Prompt::Welcome | Prompt::Summary => Vec::new(),
            Prompt::MediaServer => choice_items::<MediaServer>(),
            Prompt::Torrent => {
                let mut items = choice_items::<TorrentClient>();
                items.push(MenuItem::new("なし", "トレントを使わない"));
                items
            }
            Prompt::UsenetEnabled => yes_no_items("Usenet を使う"),
            Prompt::UsenetClient => choice_items::<UsenetClient>(),
            Prompt::Gateway => choice_items::<Gateway>(),
            Prompt::Dashboard => choice_items::<Dashboard>(),
            Prompt::Addons => self
                .offered_addons()
                .into_iter()
                .map(|addon| MenuItem {
                    checked: Some(self.selection.addons.contains(&addon)),
                    ..MenuItem::from_choice(addon)
                })
                .collect(),
            Prompt::Transcoding => self
                .offered_transcoding()
                .into_iter()
                .map(MenuItem::from_choice)
                .collect(),
            Prompt::VpnEnabled => yes_no_items("ダウンローダーを VPN 経由にする"),
            Prompt::VpnProvider => choice_items::<VpnProvider>(),
        }
    }

    /// 確認画面の各行（設問名、値）
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let s = &self.selection;
        let mut rows = vec![
            (Prompt::MediaServer.title(), s.media_server.label().to_string()),
            (Prompt::Torrent.title(), label_or_none(s.torrent)),
            (Prompt::UsenetClient.title(), label_or_none(s.usenet)),
            (Prompt::Gateway.title(), s.gateway.label().to_string()),
            (Prompt::Dashboard.title(), s.dashboard.label().to_string()),
        ];

        let addons = if s.addons.is_empty() {
            "なし".to_string()
        } else {
            s.addons
                .iter()
                .map(|a| a.label())
                .collect::<Vec<_>>()
                .join(", ")
        };
        rows.push((Prompt::Addons.title(), addons));

        let transcoding = if self.gpu_missing() {
            format!("{}（GPU 未検出）", s.transcoding.label())
        } else {
            s.transcoding.label().to_string()
        };
        rows.push((Prompt::Transcoding.title(), transcoding));
        let vpn = if self.vpn_available {
            label_or_none(s.vpn)
        } else {
            "なし（認証情報未設定）".to_string()
        };
        rows.push((Prompt::VpnProvider.title(), vpn));
        rows
    }

    fn offered_addons(&self) -> Vec<Addon> {
        Addon::ALL
            .iter()
            .copied()
            .filter(|addon| addon.supports(self.selection.media_server))
            .collect()
    }

    fn offered_transcoding(&self) -> Vec<Transcoding> {
        transcoding_options(&self.gpus)
    }

    /// 設問を表示するか
    fn applies(&self, prompt: Prompt) -> bool {
        match prompt {
            Prompt::UsenetClient => self.selection.usenet.is_some(),
            Prompt::Transcoding => !self.gpu_missing(),
            Prompt::VpnEnabled => self.vpn_available && self.selection.has_downloader(),
            Prompt::VpnProvider => self.applies(Prompt::VpnEnabled) && self.selection.vpn.is_some(),
            _ => true,
        }
    }

    /// カーソル位置の値を選択内容に反映
    fn commit(&mut self) {
        let cursor = self.cursor;
        let s = &mut self.selection;
        match self.prompt {
            Prompt::Welcome | Prompt::Summary | Prompt::Addons => {}
            Prompt::MediaServer => s.media_server = MediaServer::ALL[cursor],
            Prompt::Torrent => s.torrent = TorrentClient::ALL.get(cursor).copied(),
            Prompt::UsenetEnabled => {
                s.usenet = YES_NO[cursor].then(|| s.usenet.unwrap_or_default());
            }
            Prompt::UsenetClient => s.usenet = Some(UsenetClient::ALL[cursor]),
            Prompt::Gateway => s.gateway = Gateway::ALL[cursor],
            Prompt::Dashboard => s.dashboard = Dashboard::ALL[cursor],
            Prompt::Transcoding => {
                s.transcoding = transcoding_options(&self.gpus)
                    .get(cursor)
                    .copied()
                    .unwrap_or_default();
            }
            Prompt::VpnEnabled => {
                s.vpn = YES_NO[cursor].then(|| s.vpn.unwrap_or_default());
            }
            Prompt::VpnProvider => s.vpn = Some(VpnProvider::ALL[cursor]),
        }
        self.sanitize();
    }

    /// 表示されない設問の値を確定させる
    fn sanitize(&mut self) {
        let media_server = self.selection.media_server;
        self.selection
            .addons
            .retain(|addon| addon.supports(media_server));

        let offered = self.offered_transcoding();
        if !offered.contains(&self.selection.transcoding) {
            self.selection.transcoding = Transcoding::Software;
        }

        if !self.vpn_available || !self.selection.has_downloader() {
            self.selection.vpn = None;
        }
    }

    fn toggle_addon(&mut self) {
        if let Some(addon) = self.offered_addons().get(self.cursor).copied()
            && !self.selection.addons.remove(&addon)
        {
            self.selection.addons.insert(addon);
        }
    }

    fn advance(&mut self) {
        let position = order_index(self.prompt);
        let next = Prompt::ORDER[position + 1..]
            .iter()
            .copied()
            .find(|p| self.applies(*p))
            .unwrap_or(Prompt::Summary);

        self.history.push(self.prompt);
        self.enter(next);
    }

    fn go_back(&mut self) {
        if let Some(previous) = self.history.pop() {
            self.enter(previous);
        }
    }

    fn enter(&mut self, prompt: Prompt) {
        self.prompt = prompt;
        self.cursor = self.current_index();
    }

    /// 現在の値に対応するカーソル位置
    fn current_index(&self) -> usize {
        let s = &self.selection;
        let found = match self.prompt {
            Prompt::Welcome | Prompt::Summary | Prompt::Addons => None,
            Prompt::MediaServer => index_of(s.media_server),
            Prompt::Torrent => match s.torrent {
                Some(torrent) => index_of(torrent),
                None => Some(TorrentClient::ALL.len()),
            },
            Prompt::UsenetEnabled => Some(if s.usenet.is_some() { 0 } else { 1 }),
            Prompt::UsenetClient => s.usenet.and_then(index_of),
            Prompt::Gateway => index_of(s.gateway),
            Prompt::Dashboard => index_of(s.dashboard),
            Prompt::Transcoding => self
                .offered_transcoding()
                .iter()
                .position(|t| *t == s.transcoding),
            Prompt::VpnEnabled => Some(if s.vpn.is_some() { 0 } else { 1 }),
            Prompt::VpnProvider => s.vpn.and_then(index_of),
        };
        found.unwrap_or(0)
    }
}

fn order_index(prompt: Prompt) -> usize {
    Prompt::ORDER
        .iter()
        .position(|p| *p == prompt)
        .unwrap_or(0)
}

/// 検出済みの GPU で使えるトランスコード方式
fn transcoding_options(gpus: &[GpuVendor]) -> Vec<Transcoding> {
    let mut offered = vec![Transcoding::Software];
    if gpus.contains(&GpuVendor::Nvidia) {
        offered.push(Transcoding::Nvidia);
    }
    if gpus.contains(&GpuVendor::Intel) {
        offered.push(Transcoding::Intel);
    }
    offered
}

fn index_of<T: Choice>(value: T) -> Option<usize> {
    T::ALL.iter().position(|c| *c == value)
}

fn choice_items<T: Choice>() -> Vec<MenuItem> {
    T::ALL.iter().copied().map(MenuItem::from_choice).collect()
}

fn yes_no_items(description: &str) -> Vec<MenuItem> {
    vec![
        MenuItem::new("はい", description),
        MenuItem::new("いいえ", ""),
    ]
}

fn label_or_none<T: Choice>(value: Option<T>) -> String {
    value
        .map(|v| v.label().to_string())
        .unwrap_or_else(|| "なし".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn press(state: &mut WizardState, keys: &[Key]) -> Transition {
        let mut last = Transition::Continue;
        for key in keys {
            last = state.handle(*key);
        }
        last
    }

    /// 現在の設問でカーソルを `index` に合わせて確定
    fn choose(state: &mut WizardState, index: usize) {
        press(state, &[Key::Up; 12]);
        for _ in 0..index {
            state.handle(Key::Down);
        }
        state.handle(Key::Confirm);
    }

    fn no_gpu() -> ProbedCapabilities {
        ProbedCapabilities::default()
    }

    #[test]
    fn test_accepting_defaults() {
        let mut state = WizardState::new(Selection::default(), &no_gpu());
        let mut result = Transition::Continue;
        for _ in 0..20 {
            result = state.handle(Key::Confirm);
            if result != Transition::Continue {
                break;
            }
        }
        assert_eq!(result, Transition::Confirmed(Selection::default()));
    }

    #[test]
    fn test_abort_from_any_prompt() {
        let mut state = WizardState::new(Selection::default(), &no_gpu());
        press(&mut state, &[Key::Confirm, Key::Confirm]);
        assert_eq!(state.prompt(), Prompt::Torrent);
        assert_eq!(state.handle(Key::Abort), Transition::Aborted);
    }

    #[test]
    fn test_skips_inapplicable_prompts() {
        let mut state = WizardState::new(Selection::default(), &no_gpu());
        press(&mut state, &[Key::Confirm, Key::Confirm, Key::Confirm]);
        assert_eq!(state.prompt(), Prompt::UsenetEnabled);

        // Usenet なし → クライアント選択を飛ばす
        choose(&mut state, 1);
        assert_eq!(state.prompt(), Prompt::Gateway);

        press(&mut state, &[Key::Confirm, Key::Confirm, Key::Confirm]);
        // GPU なし → トランスコード設問を飛ばして VPN へ
        assert_eq!(state.prompt(), Prompt::VpnEnabled);

        // VPN なし → プロバイダー選択を飛ばす
        choose(&mut state, 1);
        assert_eq!(state.prompt(), Prompt::Summary);
    }

    #[test]
    fn test_vpn_not_offered_without_downloader() {
        let initial = Selection {
            torrent: None,
            usenet: None,
            vpn: Some(VpnProvider::Mullvad),
            ..Selection::default()
        };
        let mut state = WizardState::new(initial, &no_gpu());
        assert_eq!(state.selection().vpn, None);

        let result = press(&mut state, &[Key::Confirm; 10]);
        assert!(matches!(result, Transition::Confirmed(s) if s.vpn.is_none()));
    }

    #[test]
    fn test_vpn_not_offered_without_credentials() {
        let initial = Selection {
            vpn: Some(VpnProvider::Mullvad),
            ..Selection::default()
        };
        let mut state = WizardState::new(initial, &no_gpu()).with_vpn_available(false);
        assert_eq!(state.selection().vpn, None);

        let mut result = Transition::Continue;
        for _ in 0..20 {
            assert_ne!(state.prompt(), Prompt::VpnEnabled);
            assert_ne!(state.prompt(), Prompt::VpnProvider);
            result = state.handle(Key::Confirm);
            if result != Transition::Continue {
                break;
            }
        }
        assert!(matches!(result, Transition::Confirmed(s) if s.vpn.is_none()));

        let summary = state.summary();
        let (_, vpn) = summary
            .iter()
            .find(|(title, _)| *title == Prompt::VpnProvider.title())
            .unwrap();
        assert!(vpn.contains("認証情報未設定"));
    }

    #[test]
    fn test_back_returns_and_last_value_wins() {
        let mut state = WizardState::new(Selection::default(), &no_gpu());
        state.handle(Key::Confirm);
        assert_eq!(state.prompt(), Prompt::MediaServer);

        choose(&mut state, 1);
        assert_eq!(state.selection().media_server, MediaServer::Plex);
        assert_eq!(state.prompt(), Prompt::Torrent);

        state.handle(Key::Back);
        assert_eq!(state.prompt(), Prompt::MediaServer);
        assert_eq!(state.cursor(), 1);

        choose(&mut state, 2);
        assert_eq!(state.selection().media_server, MediaServer::Emby);
    }

    #[test]
    fn test_back_at_welcome_stays() {
        let mut state = WizardState::new(Selection::default(), &no_gpu());
        assert_eq!(state.handle(Key::Back), Transition::Continue);
        assert_eq!(state.prompt(), Prompt::Welcome);
    }

    #[test]
    fn test_tautulli_only_with_plex() {
        let initial = Selection {
            media_server: MediaServer::Plex,
            addons: BTreeSet::from([Addon::Tautulli]),
            ..Selection::default()
        };
        let mut state = WizardState::new(initial, &no_gpu());
        assert!(state.selection().addons.contains(&Addon::Tautulli));

        state.handle(Key::Confirm);
        choose(&mut state, 0); // Jellyfin
        assert!(!state.selection().addons.contains(&Addon::Tautulli));

        while state.prompt() != Prompt::Addons {
            state.handle(Key::Confirm);
        }
        let labels: Vec<String> = state.items().into_iter().map(|i| i.label).collect();
        assert!(!labels.contains(&Addon::Tautulli.label().to_string()));
    }

    #[test]
    fn test_addon_toggle() {
        let initial = Selection {
            addons: BTreeSet::new(),
            ..Selection::default()
        };
        let mut state = WizardState::new(initial, &no_gpu());
        while state.prompt() != Prompt::Addons {
            state.handle(Key::Confirm);
        }

        state.handle(Key::Toggle);
        assert!(state.selection().addons.contains(&Addon::Bazarr));
        assert_eq!(state.items()[0].checked, Some(true));

        state.handle(Key::Toggle);
        assert!(state.selection().addons.is_empty());
    }

    #[test]
    fn test_transcoding_offers_only_detected_vendors() {
        let capabilities = ProbedCapabilities::default().with_gpu(GpuVendor::Intel);
        let initial = Selection {
            transcoding: Transcoding::Nvidia,
            ..Selection::default()
        };
        let mut state = WizardState::new(initial, &capabilities);
        assert_eq!(state.selection().transcoding, Transcoding::Software);

        while state.prompt() != Prompt::Transcoding {
            state.handle(Key::Confirm);
        }
        assert_eq!(state.items().len(), 2);

        choose(&mut state, 1);
        assert_eq!(state.selection().transcoding, Transcoding::Intel);
    }

    #[test]
    fn test_summary_marks_missing_gpu() {
        let state = WizardState::new(Selection::default(), &no_gpu());
        let summary = state.summary();
        let (_, transcoding) = summary
            .iter()
            .find(|(title, _)| *title == Prompt::Transcoding.title())
            .unwrap();
        assert!(transcoding.contains("GPU 未検出"));
    }
}
