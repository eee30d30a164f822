// ═══════════════════════════════════════════════════════════════════════
// Reference Catalog — static city records and the skill table
//
// The skill table is the single source of truth for gold cost, cooldown,
// usage caps, category and the shape of each invocation. Every `Skill`
// variant has exactly one `SkillDef` (enforced by the exhaustive match in
// `Skill::def`).
// ═══════════════════════════════════════════════════════════════════════

use crate::types::GameMode;
use serde::{Deserialize, Serialize};

// ── City records ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CityDef {
    pub name: &'static str,
    pub hp: u32,
    pub province: &'static str,
}

/// HP ceiling that growth effects may not push a city past.
pub fn city_hp_limit(base_hp: u32) -> u32 {
    if base_hp >= 60_000 {
        120_000
    } else if base_hp >= 30_000 {
        100_000
    } else {
        80_000
    }
}

pub fn find_city(name: &str) -> Option<&'static CityDef> {
    CITIES.iter().find(|c| c.name == name)
}

pub fn province_of(name: &str) -> Option<&'static str> {
    find_city(name).map(|c| c.province)
}

pub static CITIES: &[CityDef] = &[
    // 直辖市和特区
    CityDef { name: "北京市", hp: 49843, province: "直辖市和特区" },
    CityDef { name: "上海市", hp: 53927, province: "直辖市和特区" },
    CityDef { name: "天津市", hp: 18024, province: "直辖市和特区" },
    CityDef { name: "重庆市", hp: 32193, province: "直辖市和特区" },
    CityDef { name: "香港特别行政区", hp: 28911, province: "直辖市和特区" },
    CityDef { name: "澳门特别行政区", hp: 3572, province: "直辖市和特区" },
    // 河北省
    CityDef { name: "石家庄市", hp: 8203, province: "河北省" },
    CityDef { name: "唐山市", hp: 10004, province: "河北省" },
    CityDef { name: "秦皇岛市", hp: 2121, province: "河北省" },
    CityDef { name: "邯郸市", hp: 4704, province: "河北省" },
    CityDef { name: "邢台市", hp: 2766, province: "河北省" },
    CityDef { name: "保定市", hp: 4773, province: "河北省" },
    CityDef { name: "张家口市", hp: 1913, province: "河北省" },
    CityDef { name: "承德市", hp: 1963, province: "河北省" },
    CityDef { name: "沧州市", hp: 4723, province: "河北省" },
    CityDef { name: "廊坊市", hp: 3904, province: "河北省" },
    CityDef { name: "衡水市", hp: 1972, province: "河北省" },
    CityDef { name: "雄安新区", hp: 621, province: "河北省" },
    // 江苏省
    CityDef { name: "南京市", hp: 18501, province: "江苏省" },
    CityDef { name: "无锡市", hp: 16263, province: "江苏省" },
    CityDef { name: "徐州市", hp: 9537, province: "江苏省" },
    CityDef { name: "常州市", hp: 10814, province: "江苏省" },
    CityDef { name: "苏州市", hp: 26727, province: "江苏省" },
    CityDef { name: "南通市", hp: 12422, province: "江苏省" },
    CityDef { name: "连云港市", hp: 4663, province: "江苏省" },
    CityDef { name: "淮安市", hp: 5413, province: "江苏省" },
    CityDef { name: "盐城市", hp: 7779, province: "江苏省" },
    CityDef { name: "扬州市", hp: 7810, province: "江苏省" },
    CityDef { name: "镇江市", hp: 5540, province: "江苏省" },
    CityDef { name: "泰州市", hp: 7021, province: "江苏省" },
    CityDef { name: "宿迁市", hp: 4802, province: "江苏省" },
    // 浙江省
    CityDef { name: "杭州市", hp: 21860, province: "浙江省" },
    CityDef { name: "宁波市", hp: 18148, province: "浙江省" },
    CityDef { name: "温州市", hp: 9719, province: "浙江省" },
    CityDef { name: "绍兴市", hp: 8369, province: "浙江省" },
    CityDef { name: "湖州市", hp: 4213, province: "浙江省" },
    CityDef { name: "嘉兴市", hp: 7570, province: "浙江省" },
    CityDef { name: "金华市", hp: 6926, province: "浙江省" },
    CityDef { name: "衢州市", hp: 2263, province: "浙江省" },
    CityDef { name: "台州市", hp: 6656, province: "浙江省" },
    CityDef { name: "丽水市", hp: 2181, province: "浙江省" },
    CityDef { name: "舟山市", hp: 2226, province: "浙江省" },
    // 广东省
    CityDef { name: "广州市", hp: 31033, province: "广东省" },
    CityDef { name: "深圳市", hp: 36802, province: "广东省" },
    CityDef { name: "珠海市", hp: 4479, province: "广东省" },
    CityDef { name: "汕头市", hp: 3168, province: "广东省" },
    CityDef { name: "佛山市", hp: 13362, province: "广东省" },
    CityDef { name: "韶关市", hp: 1648, province: "广东省" },
    CityDef { name: "湛江市", hp: 3840, province: "广东省" },
    CityDef { name: "肇庆市", hp: 2918, province: "广东省" },
    CityDef { name: "江门市", hp: 4210, province: "广东省" },
    CityDef { name: "茂名市", hp: 4702, province: "广东省" },
    CityDef { name: "惠州市", hp: 6136, province: "广东省" },
    CityDef { name: "梅州市", hp: 1508, province: "广东省" },
    CityDef { name: "汕尾市", hp: 1501, province: "广东省" },
    CityDef { name: "河源市", hp: 1408, province: "广东省" },
    CityDef { name: "阳江市", hp: 1630, province: "广东省" },
    CityDef { name: "清远市", hp: 2253, province: "广东省" },
    CityDef { name: "东莞市", hp: 12282, province: "广东省" },
    CityDef { name: "中山市", hp: 4143, province: "广东省" },
    CityDef { name: "潮州市", hp: 1403, province: "广东省" },
    CityDef { name: "揭阳市", hp: 2530, province: "广东省" },
    CityDef { name: "云浮市", hp: 1309, province: "广东省" },
    // 山东省
    CityDef { name: "济南市", hp: 13528, province: "山东省" },
    CityDef { name: "青岛市", hp: 16719, province: "山东省" },
    CityDef { name: "淄博市", hp: 4884, province: "山东省" },
    CityDef { name: "枣庄市", hp: 2386, province: "山东省" },
    CityDef { name: "东营市", hp: 4308, province: "山东省" },
    CityDef { name: "烟台市", hp: 10783, province: "山东省" },
    CityDef { name: "潍坊市", hp: 8203, province: "山东省" },
    CityDef { name: "济宁市", hp: 5867, province: "山东省" },
    CityDef { name: "泰安市", hp: 3622, province: "山东省" },
    CityDef { name: "威海市", hp: 3729, province: "山东省" },
    CityDef { name: "日照市", hp: 2557, province: "山东省" },
    CityDef { name: "滨州市", hp: 3405, province: "山东省" },
    CityDef { name: "德州市", hp: 4048, province: "山东省" },
    CityDef { name: "聊城市", hp: 3168, province: "山东省" },
    CityDef { name: "临沂市", hp: 6556, province: "山东省" },
    CityDef { name: "菏泽市", hp: 4803, province: "山东省" },
    // 四川省
    CityDef { name: "成都市", hp: 23511, province: "四川省" },
    CityDef { name: "绵阳市", hp: 4344, province: "四川省" },
    CityDef { name: "自贡市", hp: 1876, province: "四川省" },
    CityDef { name: "攀枝花市", hp: 1395, province: "四川省" },
    CityDef { name: "泸州市", hp: 2837, province: "四川省" },
    CityDef { name: "德阳市", hp: 3265, province: "四川省" },
    CityDef { name: "广元市", hp: 1279, province: "四川省" },
    CityDef { name: "遂宁市", hp: 1870, province: "四川省" },
    CityDef { name: "内江市", hp: 1943, province: "四川省" },
    CityDef { name: "乐山市", hp: 2533, province: "四川省" },
    CityDef { name: "资阳市", hp: 1090, province: "四川省" },
    CityDef { name: "宜宾市", hp: 4006, province: "四川省" },
    CityDef { name: "南充市", hp: 2862, province: "四川省" },
    CityDef { name: "达州市", hp: 2802, province: "四川省" },
    CityDef { name: "雅安市", hp: 1083, province: "四川省" },
    CityDef { name: "阿坝州", hp: 570, province: "四川省" },
    CityDef { name: "甘孜州", hp: 581, province: "四川省" },
    CityDef { name: "凉山州", hp: 2475, province: "四川省" },
    CityDef { name: "广安市", hp: 1616, province: "四川省" },
    CityDef { name: "巴中市", hp: 871, province: "四川省" },
    CityDef { name: "眉山市", hp: 1890, province: "四川省" },
    // 湖北省
    CityDef { name: "武汉市", hp: 21106, province: "湖北省" },
    CityDef { name: "黄石市", hp: 2306, province: "湖北省" },
    CityDef { name: "十堰市", hp: 2566, province: "湖北省" },
    CityDef { name: "荆州市", hp: 3506, province: "湖北省" },
    CityDef { name: "宜昌市", hp: 6191, province: "湖北省" },
    CityDef { name: "襄阳市", hp: 6102, province: "湖北省" },
    CityDef { name: "鄂州市", hp: 1341, province: "湖北省" },
    CityDef { name: "荆门市", hp: 2460, province: "湖北省" },
    CityDef { name: "黄冈市", hp: 3217, province: "湖北省" },
    CityDef { name: "孝感市", hp: 3259, province: "湖北省" },
    CityDef { name: "咸宁市", hp: 1945, province: "湖北省" },
    CityDef { name: "仙桃市", hp: 1125, province: "湖北省" },
    CityDef { name: "潜江市", hp: 952, province: "湖北省" },
    CityDef { name: "神农架林区", hp: 49, province: "湖北省" },
    CityDef { name: "恩施州", hp: 1661, province: "湖北省" },
    CityDef { name: "天门市", hp: 785, province: "湖北省" },
    CityDef { name: "随州市", hp: 1442, province: "湖北省" },
    // 福建省
    CityDef { name: "福州市", hp: 14237, province: "福建省" },
    CityDef { name: "莆田市", hp: 3443, province: "福建省" },
    CityDef { name: "泉州市", hp: 13095, province: "福建省" },
    CityDef { name: "厦门市", hp: 8589, province: "福建省" },
    CityDef { name: "漳州市", hp: 6064, province: "福建省" },
    CityDef { name: "龙岩市", hp: 3419, province: "福建省" },
    CityDef { name: "三明市", hp: 2923, province: "福建省" },
    CityDef { name: "南平市", hp: 2090, province: "福建省" },
    CityDef { name: "宁德市", hp: 3902, province: "福建省" },
    // 河南省
    CityDef { name: "郑州市", hp: 14532, province: "河南省" },
    CityDef { name: "开封市", hp: 2761, province: "河南省" },
    CityDef { name: "洛阳市", hp: 5819, province: "河南省" },
    CityDef { name: "平顶山市", hp: 2832, province: "河南省" },
    CityDef { name: "安阳市", hp: 2672, province: "河南省" },
    CityDef { name: "鹤壁市", hp: 1094, province: "河南省" },
    CityDef { name: "新乡市", hp: 3570, province: "河南省" },
    CityDef { name: "焦作市", hp: 2369, province: "河南省" },
    CityDef { name: "濮阳市", hp: 2019, province: "河南省" },
    CityDef { name: "许昌市", hp: 3441, province: "河南省" },
    CityDef { name: "漯河市", hp: 1870, province: "河南省" },
    CityDef { name: "三门峡市", hp: 1619, province: "河南省" },
    CityDef { name: "商丘市", hp: 3272, province: "河南省" },
    CityDef { name: "周口市", hp: 3636, province: "河南省" },
    CityDef { name: "驻马店市", hp: 3343, province: "河南省" },
    CityDef { name: "南阳市", hp: 4879, province: "河南省" },
    CityDef { name: "信阳市", hp: 3073, province: "河南省" },
    CityDef { name: "济源市", hp: 790, province: "河南省" },
];

// ── Skill table types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Battle,
    NonBattle,
}

/// Which player, besides the caster, an invocation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRule {
    None,
    /// A live player on another side.
    Opponent,
    /// Any live player other than the caster.
    Other,
    /// The caster's live teammate (team mode).
    Teammate,
    /// The caster or any live player.
    Any,
}

/// How many city names an invocation passes for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arity {
    None,
    Exactly(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::None => n == 0,
            Arity::Exactly(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
        }
    }

    pub fn max(self) -> usize {
        match self {
            Arity::None => 0,
            Arity::Exactly(k) => k,
            Arity::Range(_, hi) => hi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CityState {
    Alive,
    Dead,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageLimit {
    Unlimited,
    PerGame(u32),
    PerCity(u32),
}

/// Minimum base cost the cost-increase surcharge applies to.
pub const PAID_TIER_THRESHOLD: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkillDef {
    pub skill: Skill,
    pub cost: u8,
    pub category: Category,
    /// Rounds that must pass after a use before the next one.
    pub cooldown: u32,
    pub usage_limit: UsageLimit,
    pub target: TargetRule,
    pub own_cities: Arity,
    pub own_state: CityState,
    pub their_cities: Arity,
    pub their_state: CityState,
    /// Empty means legal in every mode.
    pub modes: &'static [GameMode],
    /// Modes in which the caster's own city argument may not be the center.
    pub no_center_in: &'static [GameMode],
}

impl SkillDef {
    fn new(skill: Skill, cost: u8, category: Category) -> Self {
        SkillDef {
            skill,
            cost,
            category,
            cooldown: 0,
            usage_limit: UsageLimit::Unlimited,
            target: TargetRule::None,
            own_cities: Arity::None,
            own_state: CityState::Alive,
            their_cities: Arity::None,
            their_state: CityState::Alive,
            modes: &[],
            no_center_in: &[],
        }
    }

    fn target(mut self, rule: TargetRule) -> Self {
        self.target = rule;
        self
    }

    fn own(mut self, arity: Arity) -> Self {
        self.own_cities = arity;
        self
    }

    fn theirs(mut self, arity: Arity) -> Self {
        self.their_cities = arity;
        self
    }

    fn own_state(mut self, state: CityState) -> Self {
        self.own_state = state;
        self
    }

    fn their_state(mut self, state: CityState) -> Self {
        self.their_state = state;
        self
    }

    fn limit(mut self, limit: UsageLimit) -> Self {
        self.usage_limit = limit;
        self
    }

    fn cooldown(mut self, rounds: u32) -> Self {
        self.cooldown = rounds;
        self
    }

    fn modes(mut self, modes: &'static [GameMode]) -> Self {
        self.modes = modes;
        self
    }

    fn no_center_in(mut self, modes: &'static [GameMode]) -> Self {
        self.no_center_in = modes;
        self
    }

    /// Base cost in the given mode, before any surcharge.
    pub fn cost_in(&self, mode: GameMode) -> u8 {
        match (self.skill, mode) {
            (Skill::HoldPosition, GameMode::ThreePlayer) => 4,
            _ => self.cost,
        }
    }

    pub fn legal_in(&self, mode: GameMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }
}

/// Price of banning `banned` with 事半功倍: half its cost rounded up, 1..=8.
pub fn ban_cost(banned: Skill) -> u8 {
    banned.def().cost.div_ceil(2).clamp(1, 8)
}

// ── Skills ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    HoldPosition,
    CaptureTheKing,
    FearEveryBush,
    BraveryInBattle,
    AttractFire,
    SettleIn,
    BronzeWall,
    Foresight,
    SecretPassage,
    LastStand,
    MutualDestruction,
    RoyalExpedition,
    FeignRetreat,
    BorrowArrows,
    Berserk,
    WaitAtEase,
    Plunder,
    Dizzy,
    WatchFire,
    SowDiscord,
    Counterstrike,
    BesiegeWei,
    SetBarrier,
    PotentialSurge,
    TransferGold,
    GoldLoan,
    FinancialCrisis,
    RobTheRich,
    TurnOfFortune,
    CostIncrease,
    BanSkill,
    StareDown,
    SkillShield,
    Decisive,
    Unblock,
    HairTrigger,
    Breakthrough,
    Jianbukecui,
    BrickForJade,
    CityProtection,
    IronCity,
    Anchor,
    Avoidance,
    QuickHeal,
    AdvancedHeal,
    Revive,
    LastGasp,
    Refresh,
    UnitedFront,
    TwoBirds,
    Strengthen,
    Erudite,
    CityTrial,
    StepUp,
    Morale,
    AdministrativeCenter,
    PlannedCity,
    PurpleChamber,
    SubCenter,
    DeepHiding,
    Accumulate,
    HpBank,
    Midas,
    Scapegoat,
    ChangeCourse,
    StrategicShift,
    MutualAid,
    ChangeFlag,
    Fearless,
    BaseTwist,
    Uniformity,
    ClearBuffs,
    Disaster,
    Plummet,
    Barrage,
    Inversion,
    DigitReverse,
    Surge,
    Bombard,
    SweepClean,
    ArrowVolley,
    ChainReaction,
    DimensionStrike,
    TimeBomb,
    Annihilate,
    Raze,
    Merciless,
    MercilessOrange,
    Electromagnetic,
    InFighting,
    GoldenMean,
    SacrificeKin,
    BurnBridges,
    GraftFlower,
    JadeShatter,
    PreemptiveStrike,
    HostageExchange,
    Recruit,
    ForcedHaul,
    AmbushRandom,
    AmbushTargeted,
    SurroundedBySongs,
    Surrender,
    RelocateBasic,
    RelocateAdvanced,
    SomethingFromNothing,
    ReinforceBasic,
    ReinforceAdvanced,
    CityDetective,
    Prophecy,
    Scrutiny,
    Disguise,
    Mirage,
    Trackless,
    Feint,
    Alliance,
}

impl Skill {
    pub const ALL: [Skill; 116] = [
        Skill::HoldPosition,
        Skill::CaptureTheKing,
        Skill::FearEveryBush,
        Skill::BraveryInBattle,
        Skill::AttractFire,
        Skill::SettleIn,
        Skill::BronzeWall,
        Skill::Foresight,
        Skill::SecretPassage,
        Skill::LastStand,
        Skill::MutualDestruction,
        Skill::RoyalExpedition,
        Skill::FeignRetreat,
        Skill::BorrowArrows,
        Skill::Berserk,
        Skill::WaitAtEase,
        Skill::Plunder,
        Skill::Dizzy,
        Skill::WatchFire,
        Skill::SowDiscord,
        Skill::Counterstrike,
        Skill::BesiegeWei,
        Skill::SetBarrier,
        Skill::PotentialSurge,
        Skill::TransferGold,
        Skill::GoldLoan,
        Skill::FinancialCrisis,
        Skill::RobTheRich,
        Skill::TurnOfFortune,
        Skill::CostIncrease,
        Skill::BanSkill,
        Skill::StareDown,
        Skill::SkillShield,
        Skill::Decisive,
        Skill::Unblock,
        Skill::HairTrigger,
        Skill::Breakthrough,
        Skill::Jianbukecui,
        Skill::BrickForJade,
        Skill::CityProtection,
        Skill::IronCity,
        Skill::Anchor,
        Skill::Avoidance,
        Skill::QuickHeal,
        Skill::AdvancedHeal,
        Skill::Revive,
        Skill::LastGasp,
        Skill::Refresh,
        Skill::UnitedFront,
        Skill::TwoBirds,
        Skill::Strengthen,
        Skill::Erudite,
        Skill::CityTrial,
        Skill::StepUp,
        Skill::Morale,
        Skill::AdministrativeCenter,
        Skill::PlannedCity,
        Skill::PurpleChamber,
        Skill::SubCenter,
        Skill::DeepHiding,
        Skill::Accumulate,
        Skill::HpBank,
        Skill::Midas,
        Skill::Scapegoat,
        Skill::ChangeCourse,
        Skill::StrategicShift,
        Skill::MutualAid,
        Skill::ChangeFlag,
        Skill::Fearless,
        Skill::BaseTwist,
        Skill::Uniformity,
        Skill::ClearBuffs,
        Skill::Disaster,
        Skill::Plummet,
        Skill::Barrage,
        Skill::Inversion,
        Skill::DigitReverse,
        Skill::Surge,
        Skill::Bombard,
        Skill::SweepClean,
        Skill::ArrowVolley,
        Skill::ChainReaction,
        Skill::DimensionStrike,
        Skill::TimeBomb,
        Skill::Annihilate,
        Skill::Raze,
        Skill::Merciless,
        Skill::MercilessOrange,
        Skill::Electromagnetic,
        Skill::InFighting,
        Skill::GoldenMean,
        Skill::SacrificeKin,
        Skill::BurnBridges,
        Skill::GraftFlower,
        Skill::JadeShatter,
        Skill::PreemptiveStrike,
        Skill::HostageExchange,
        Skill::Recruit,
        Skill::ForcedHaul,
        Skill::AmbushRandom,
        Skill::AmbushTargeted,
        Skill::SurroundedBySongs,
        Skill::Surrender,
        Skill::RelocateBasic,
        Skill::RelocateAdvanced,
        Skill::SomethingFromNothing,
        Skill::ReinforceBasic,
        Skill::ReinforceAdvanced,
        Skill::CityDetective,
        Skill::Prophecy,
        Skill::Scrutiny,
        Skill::Disguise,
        Skill::Mirage,
        Skill::Trackless,
        Skill::Feint,
        Skill::Alliance,
    ];

    /// Display name, also the identifier callers invoke skills by.
    pub fn name(self) -> &'static str {
        match self {
            Skill::HoldPosition => "按兵不动",
            Skill::CaptureTheKing => "擒贼擒王",
            Skill::FearEveryBush => "草木皆兵",
            Skill::BraveryInBattle => "越战越勇",
            Skill::AttractFire => "吸引攻击",
            Skill::SettleIn => "既来则安",
            Skill::BronzeWall => "铜墙铁壁",
            Skill::Foresight => "料事如神",
            Skill::SecretPassage => "暗度陈仓",
            Skill::LastStand => "背水一战",
            Skill::MutualDestruction => "同归于尽",
            Skill::RoyalExpedition => "御驾亲征",
            Skill::FeignRetreat => "欲擒故纵",
            Skill::BorrowArrows => "草船借箭",
            Skill::Berserk => "狂暴模式",
            Skill::WaitAtEase => "以逸待劳",
            Skill::Plunder => "趁火打劫",
            Skill::Dizzy => "晕头转向",
            Skill::WatchFire => "隔岸观火",
            Skill::SowDiscord => "挑拨离间",
            Skill::Counterstrike => "反戈一击",
            Skill::BesiegeWei => "围魏救赵",
            Skill::SetBarrier => "设置屏障",
            Skill::PotentialSurge => "潜能激发",
            Skill::TransferGold => "转账给他人",
            Skill::GoldLoan => "金币贷款",
            Skill::FinancialCrisis => "金融危机",
            Skill::RobTheRich => "劫富济贫",
            Skill::TurnOfFortune => "时来运转",
            Skill::CostIncrease => "釜底抽薪",
            Skill::BanSkill => "事半功倍",
            Skill::StareDown => "目不转睹",
            Skill::SkillShield => "技能保护",
            Skill::Decisive => "当机立断",
            Skill::Unblock => "解除封锁",
            Skill::HairTrigger => "一触即发",
            Skill::Breakthrough => "突破瓶颈",
            Skill::Jianbukecui => "坚不可摧",
            Skill::BrickForJade => "抛砖引玉",
            Skill::CityProtection => "城市保护",
            Skill::IronCity => "钢铁城市",
            Skill::Anchor => "定海神针",
            Skill::Avoidance => "避而不见",
            Skill::QuickHeal => "快速治疗",
            Skill::AdvancedHeal => "高级治疗",
            Skill::Revive => "借尸还魂",
            Skill::LastGasp => "苟延残喘",
            Skill::Refresh => "焕然一新",
            Skill::UnitedFront => "众志成城",
            Skill::TwoBirds => "一举两得",
            Skill::Strengthen => "实力增强",
            Skill::Erudite => "博学多才",
            Skill::CityTrial => "城市试炼",
            Skill::StepUp => "步步高升",
            Skill::Morale => "士气大振",
            Skill::AdministrativeCenter => "行政中心",
            Skill::PlannedCity => "计划单列",
            Skill::PurpleChamber => "生于紫室",
            Skill::SubCenter => "副中心制",
            Skill::DeepHiding => "深藏不露",
            Skill::Accumulate => "厚积薄发",
            Skill::HpBank => "血量存储",
            Skill::Midas => "点石成金",
            Skill::Scapegoat => "李代桃僵",
            Skill::ChangeCourse => "改弦更张",
            Skill::StrategicShift => "战略转移",
            Skill::MutualAid => "守望相助",
            Skill::ChangeFlag => "拔旗易帜",
            Skill::Fearless => "无知无畏",
            Skill::BaseTwist => "进制扭曲",
            Skill::Uniformity => "整齐划一",
            Skill::ClearBuffs => "清除加成",
            Skill::Disaster => "天灾人祸",
            Skill::Plummet => "一落千丈",
            Skill::Barrage => "连续打击",
            Skill::Inversion => "倒反天罡",
            Skill::DigitReverse => "数位反转",
            Skill::Surge => "波涛汹涌",
            Skill::Bombard => "狂轰滥炸",
            Skill::SweepClean => "横扫一空",
            Skill::ArrowVolley => "万箭齐发",
            Skill::ChainReaction => "连锁反应",
            Skill::DimensionStrike => "降维打击",
            Skill::TimeBomb => "定时爆破",
            Skill::Annihilate => "灰飞烟灭",
            Skill::Raze => "夷为平地",
            Skill::Merciless => "毫不留情",
            Skill::MercilessOrange => "毫不留情·橙卡",
            Skill::Electromagnetic => "电磁感应",
            Skill::InFighting => "自相残杀",
            Skill::GoldenMean => "中庸之道",
            Skill::SacrificeKin => "大义灭亲",
            Skill::BurnBridges => "过河拆桥",
            Skill::GraftFlower => "移花接木",
            Skill::JadeShatter => "玉碎瓦全",
            Skill::PreemptiveStrike => "先声夺人",
            Skill::HostageExchange => "人质交换",
            Skill::Recruit => "招贤纳士",
            Skill::ForcedHaul => "强制搬运",
            Skill::AmbushRandom => "趁其不备·随机",
            Skill::AmbushTargeted => "趁其不备·指定",
            Skill::SurroundedBySongs => "四面楚歌",
            Skill::Surrender => "以礼来降",
            Skill::RelocateBasic => "强制转移·普通",
            Skill::RelocateAdvanced => "强制转移·高级",
            Skill::SomethingFromNothing => "无中生有",
            Skill::ReinforceBasic => "搬运救兵·普通",
            Skill::ReinforceAdvanced => "搬运救兵·高级",
            Skill::CityDetective => "城市侦探",
            Skill::Prophecy => "城市预言",
            Skill::Scrutiny => "明察秋毫",
            Skill::Disguise => "狐假虎威",
            Skill::Mirage => "海市蜃楼",
            Skill::Trackless => "不露踪迹",
            Skill::Feint => "声东击西",
            Skill::Alliance => "合纵连横",
        }
    }

    pub fn from_name(name: &str) -> Option<Skill> {
        Skill::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Membership in the fixed set of hostile skills an active jianbukecui
    /// shield turns away. The check runs against a target player, so
    /// every member must take one.
    pub fn blocked_by_jianbukecui(self) -> bool {
        matches!(
            self,
            Skill::AttractFire
                | Skill::BronzeWall
                | Skill::Foresight
                | Skill::LastStand
                | Skill::MutualDestruction
                | Skill::RoyalExpedition
                | Skill::FeignRetreat
                | Skill::BorrowArrows
                | Skill::Dizzy
                | Skill::WatchFire
                | Skill::SowDiscord
                | Skill::Counterstrike
                | Skill::BesiegeWei
                | Skill::RobTheRich
                | Skill::TurnOfFortune
                | Skill::CostIncrease
                | Skill::Fearless
                | Skill::BaseTwist
                | Skill::Uniformity
                | Skill::ClearBuffs
                | Skill::Disaster
                | Skill::Plummet
                | Skill::Barrage
                | Skill::Inversion
                | Skill::DigitReverse
                | Skill::Surge
                | Skill::Bombard
                | Skill::SweepClean
                | Skill::ArrowVolley
                | Skill::ChainReaction
                | Skill::DimensionStrike
                | Skill::TimeBomb
                | Skill::Annihilate
                | Skill::Raze
                | Skill::Merciless
                | Skill::MercilessOrange
                | Skill::Electromagnetic
                | Skill::InFighting
                | Skill::GoldenMean
                | Skill::SacrificeKin
                | Skill::HostageExchange
                | Skill::Recruit
                | Skill::ForcedHaul
                | Skill::AmbushRandom
                | Skill::AmbushTargeted
                | Skill::RelocateBasic
                | Skill::RelocateAdvanced
        )
    }

    pub fn def(self) -> SkillDef {
        use Category::{Battle, NonBattle};
        match self {
            Skill::HoldPosition => SkillDef::new(self, 2, Battle),
            Skill::CaptureTheKing => SkillDef::new(self, 3, Battle),
            Skill::FearEveryBush => SkillDef::new(self, 3, Battle).target(TargetRule::Opponent),
            Skill::BraveryInBattle => SkillDef::new(self, 3, Battle).own(Arity::Exactly(1)),
            Skill::AttractFire => SkillDef::new(self, 4, Battle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1)),
            Skill::SettleIn => SkillDef::new(self, 4, Battle).own(Arity::Exactly(1)),
            Skill::BronzeWall => SkillDef::new(self, 5, Battle).target(TargetRule::Opponent),
            Skill::Foresight => SkillDef::new(self, 6, Battle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::SecretPassage => SkillDef::new(self, 6, Battle).modes(&[GameMode::ThreePlayer]),
            Skill::LastStand => SkillDef::new(self, 6, Battle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1)),
            Skill::MutualDestruction => SkillDef::new(self, 7, Battle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1)),
            Skill::RoyalExpedition => SkillDef::new(self, 8, Battle).target(TargetRule::Opponent),
            Skill::FeignRetreat => SkillDef::new(self, 7, Battle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::BorrowArrows => SkillDef::new(self, 8, Battle).target(TargetRule::Opponent),
            Skill::Berserk => SkillDef::new(self, 7, Battle)
                .own(Arity::Exactly(1))
                .limit(UsageLimit::PerCity(1)),
            Skill::WaitAtEase => SkillDef::new(self, 6, Battle).target(TargetRule::Opponent),
            Skill::Plunder => SkillDef::new(self, 8, Battle).target(TargetRule::Opponent),
            Skill::Dizzy => SkillDef::new(self, 10, Battle).target(TargetRule::Opponent),
            Skill::WatchFire => SkillDef::new(self, 10, Battle)
                .target(TargetRule::Opponent)
                .modes(&[GameMode::ThreePlayer]),
            Skill::SowDiscord => SkillDef::new(self, 10, Battle)
                .target(TargetRule::Opponent)
                .modes(&[GameMode::TwoVsTwo]),
            Skill::Counterstrike => SkillDef::new(self, 11, Battle).target(TargetRule::Opponent),
            Skill::BesiegeWei => SkillDef::new(self, 12, Battle)
                .target(TargetRule::Opponent)
                .limit(UsageLimit::PerGame(2)),
            Skill::SetBarrier => SkillDef::new(self, 15, Battle).cooldown(3),
            Skill::PotentialSurge => SkillDef::new(self, 20, Battle).limit(UsageLimit::PerGame(1)),
            Skill::TransferGold => SkillDef::new(self, 0, NonBattle).target(TargetRule::Other),
            Skill::GoldLoan => SkillDef::new(self, 1, NonBattle),
            Skill::FinancialCrisis => SkillDef::new(self, 1, NonBattle),
            Skill::RobTheRich => SkillDef::new(self, 5, NonBattle).target(TargetRule::Opponent),
            Skill::TurnOfFortune => SkillDef::new(self, 5, NonBattle).target(TargetRule::Opponent),
            Skill::CostIncrease => SkillDef::new(self, 5, NonBattle).target(TargetRule::Opponent),
            Skill::BanSkill => SkillDef::new(self, 1, NonBattle).target(TargetRule::Opponent),
            Skill::StareDown => SkillDef::new(self, 7, NonBattle).target(TargetRule::Opponent),
            Skill::SkillShield => SkillDef::new(self, 5, NonBattle),
            Skill::Decisive => SkillDef::new(self, 10, NonBattle),
            Skill::Unblock => SkillDef::new(self, 7, NonBattle),
            Skill::HairTrigger => SkillDef::new(self, 5, NonBattle),
            Skill::Breakthrough => SkillDef::new(self, 5, NonBattle),
            Skill::Jianbukecui => SkillDef::new(self, 5, NonBattle),
            Skill::BrickForJade => SkillDef::new(self, 2, NonBattle),
            Skill::CityProtection => SkillDef::new(self, 3, NonBattle)
                .own(Arity::Exactly(1))
                .no_center_in(&[GameMode::TwoPlayer, GameMode::TwoVsTwo]),
            Skill::IronCity => SkillDef::new(self, 5, NonBattle).own(Arity::Exactly(1)),
            Skill::Anchor => SkillDef::new(self, 1, NonBattle).own(Arity::Exactly(1)),
            Skill::Avoidance => SkillDef::new(self, 5, NonBattle).own(Arity::Exactly(1)),
            Skill::QuickHeal => SkillDef::new(self, 3, NonBattle).own(Arity::Exactly(1)),
            Skill::AdvancedHeal => SkillDef::new(self, 4, NonBattle).own(Arity::Range(1, 2)),
            Skill::Revive => SkillDef::new(self, 4, NonBattle)
                .own(Arity::Exactly(1))
                .own_state(CityState::Dead)
                .limit(UsageLimit::PerGame(2)),
            Skill::LastGasp => SkillDef::new(self, 4, NonBattle),
            Skill::Refresh => SkillDef::new(self, 2, NonBattle).own(Arity::Exactly(1)),
            Skill::UnitedFront => SkillDef::new(self, 5, NonBattle).own(Arity::Range(2, 3)),
            Skill::TwoBirds => SkillDef::new(self, 3, NonBattle).own(Arity::Exactly(2)),
            Skill::Strengthen => SkillDef::new(self, 5, NonBattle)
                .own(Arity::Exactly(1))
                .limit(UsageLimit::PerCity(1)),
            Skill::Erudite => SkillDef::new(self, 6, NonBattle).own(Arity::Exactly(1)),
            Skill::CityTrial => SkillDef::new(self, 4, NonBattle).own(Arity::Exactly(1)),
            Skill::StepUp => SkillDef::new(self, 12, NonBattle),
            Skill::Morale => SkillDef::new(self, 8, NonBattle),
            Skill::AdministrativeCenter => SkillDef::new(self, 15, NonBattle).limit(UsageLimit::PerGame(1)),
            Skill::PlannedCity => SkillDef::new(self, 14, NonBattle).own(Arity::Exactly(1)),
            Skill::PurpleChamber => SkillDef::new(self, 16, NonBattle)
                .own(Arity::Exactly(1))
                .limit(UsageLimit::PerGame(1)),
            Skill::SubCenter => SkillDef::new(self, 11, NonBattle).own(Arity::Exactly(1)),
            Skill::DeepHiding => SkillDef::new(self, 8, NonBattle).own(Arity::Exactly(1)),
            Skill::Accumulate => SkillDef::new(self, 9, NonBattle),
            Skill::HpBank => SkillDef::new(self, 6, NonBattle).own(Arity::Exactly(1)),
            Skill::Midas => SkillDef::new(self, 7, NonBattle).own(Arity::Exactly(1)),
            Skill::Scapegoat => SkillDef::new(self, 6, NonBattle).own(Arity::Exactly(1)),
            Skill::ChangeCourse => SkillDef::new(self, 2, NonBattle).own(Arity::Exactly(1)),
            Skill::StrategicShift => SkillDef::new(self, 9, NonBattle).own(Arity::Exactly(1)),
            Skill::MutualAid => SkillDef::new(self, 6, NonBattle)
                .target(TargetRule::Teammate)
                .modes(&[GameMode::TwoVsTwo]),
            Skill::ChangeFlag => SkillDef::new(self, 3, NonBattle).own(Arity::Exactly(1)),
            Skill::Fearless => SkillDef::new(self, 2, NonBattle).target(TargetRule::Opponent),
            Skill::BaseTwist => SkillDef::new(self, 4, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Uniformity => SkillDef::new(self, 4, NonBattle).target(TargetRule::Opponent),
            Skill::ClearBuffs => SkillDef::new(self, 5, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Disaster => SkillDef::new(self, 6, NonBattle).target(TargetRule::Opponent),
            Skill::Plummet => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Barrage => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(2)),
            Skill::Inversion => SkillDef::new(self, 7, NonBattle).target(TargetRule::Opponent),
            Skill::DigitReverse => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Any)
                .theirs(Arity::Exactly(1)),
            Skill::Surge => SkillDef::new(self, 8, NonBattle).target(TargetRule::Opponent),
            Skill::Bombard => SkillDef::new(self, 8, NonBattle).target(TargetRule::Opponent),
            Skill::SweepClean => SkillDef::new(self, 7, NonBattle).target(TargetRule::Opponent),
            Skill::ArrowVolley => SkillDef::new(self, 8, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::ChainReaction => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::DimensionStrike => SkillDef::new(self, 8, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::TimeBomb => SkillDef::new(self, 8, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Annihilate => SkillDef::new(self, 9, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Raze => SkillDef::new(self, 12, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::Merciless => SkillDef::new(self, 11, NonBattle).target(TargetRule::Opponent),
            Skill::MercilessOrange => SkillDef::new(self, 19, NonBattle).target(TargetRule::Opponent),
            Skill::Electromagnetic => SkillDef::new(self, 9, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::InFighting => SkillDef::new(self, 9, NonBattle).target(TargetRule::Opponent),
            Skill::GoldenMean => SkillDef::new(self, 12, NonBattle).target(TargetRule::Opponent),
            Skill::SacrificeKin => SkillDef::new(self, 13, NonBattle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1)),
            Skill::BurnBridges => SkillDef::new(self, 9, NonBattle).target(TargetRule::Opponent),
            Skill::GraftFlower => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1))
                .theirs(Arity::Exactly(1)),
            Skill::JadeShatter => SkillDef::new(self, 5, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::PreemptiveStrike => SkillDef::new(self, 1, NonBattle)
                .target(TargetRule::Opponent)
                .own(Arity::Exactly(1))
                .theirs(Arity::Exactly(1)),
            Skill::HostageExchange => SkillDef::new(self, 4, NonBattle).target(TargetRule::Opponent),
            Skill::Recruit => SkillDef::new(self, 8, NonBattle).target(TargetRule::Opponent),
            Skill::ForcedHaul => SkillDef::new(self, 13, NonBattle).target(TargetRule::Opponent),
            Skill::AmbushRandom => SkillDef::new(self, 10, NonBattle).target(TargetRule::Opponent),
            Skill::AmbushTargeted => SkillDef::new(self, 13, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::SurroundedBySongs => SkillDef::new(self, 23, NonBattle)
                .target(TargetRule::Opponent)
                .limit(UsageLimit::PerGame(1)),
            Skill::Surrender => SkillDef::new(self, 15, NonBattle).target(TargetRule::Opponent),
            Skill::RelocateBasic => SkillDef::new(self, 13, NonBattle).target(TargetRule::Opponent),
            Skill::RelocateAdvanced => SkillDef::new(self, 19, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1)),
            Skill::SomethingFromNothing => SkillDef::new(self, 5, NonBattle),
            Skill::ReinforceBasic => SkillDef::new(self, 11, NonBattle),
            Skill::ReinforceAdvanced => SkillDef::new(self, 13, NonBattle),
            Skill::CityDetective => SkillDef::new(self, 1, NonBattle)
                .target(TargetRule::Opponent)
                .theirs(Arity::Exactly(1))
                .their_state(CityState::Any),
            Skill::Prophecy => SkillDef::new(self, 6, NonBattle).target(TargetRule::Opponent),
            Skill::Scrutiny => SkillDef::new(self, 3, NonBattle).target(TargetRule::Opponent),
            Skill::Disguise => SkillDef::new(self, 7, NonBattle).own(Arity::Exactly(1)),
            Skill::Mirage => SkillDef::new(self, 6, NonBattle),
            Skill::Trackless => SkillDef::new(self, 7, NonBattle),
            Skill::Feint => SkillDef::new(self, 3, NonBattle)
                .target(TargetRule::Opponent)
                .modes(&[GameMode::ThreePlayer]),
            Skill::Alliance => SkillDef::new(self, 7, NonBattle)
                .target(TargetRule::Opponent)
                .modes(&[GameMode::ThreePlayer]),
        }
    }
}
